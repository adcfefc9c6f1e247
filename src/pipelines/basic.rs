use crate::data_structures::{
    instance::InstanceRaw,
    model::{ModelVertex, Vertex},
    texture::Texture,
};

/// Depth behaviour of a pipeline inside the main pass.
#[derive(Clone, Copy, Debug)]
pub struct DepthMode {
    pub write: bool,
    pub compare: wgpu::CompareFunction,
    pub bias: wgpu::DepthBiasState,
}

impl DepthMode {
    pub const OPAQUE: Self = Self {
        write: true,
        compare: wgpu::CompareFunction::Less,
        bias: wgpu::DepthBiasState {
            constant: 0,
            slope_scale: 0.0,
            clamp: 0.0,
        },
    };

    /// Tested against the scene but never occludes it.
    pub const OVERLAY: Self = Self {
        write: false,
        compare: wgpu::CompareFunction::LessEqual,
        bias: wgpu::DepthBiasState {
            constant: 0,
            slope_scale: 0.0,
            clamp: 0.0,
        },
    };

    pub const BACKGROUND: Self = Self {
        write: false,
        compare: wgpu::CompareFunction::Always,
        bias: wgpu::DepthBiasState {
            constant: 0,
            slope_scale: 0.0,
            clamp: 0.0,
        },
    };
}

/// Meshes lit by the ambient and directional light, shadowed and tone mapped.
///
/// Bind groups: 0 material, 1 camera, 2 light, 3 environment.
pub fn mk_lit_pipeline(
    device: &wgpu::Device,
    color_format: wgpu::TextureFormat,
    sample_count: u32,
    material_layout: &wgpu::BindGroupLayout,
    camera_layout: &wgpu::BindGroupLayout,
    light_layout: &wgpu::BindGroupLayout,
    environment_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Lit Pipeline Layout"),
        bind_group_layouts: &[
            material_layout,
            camera_layout,
            light_layout,
            environment_layout,
        ],
        push_constant_ranges: &[],
    });

    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Lit Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
    };

    mk_render_pipeline(
        device,
        &layout,
        "Lit Pipeline",
        Some(color_format),
        Some(wgpu::BlendState::REPLACE),
        Some(DepthMode::OPAQUE),
        wgpu::PrimitiveTopology::TriangleList,
        // floor plans are often modelled with single-sided walls
        None,
        &[ModelVertex::desc(), InstanceRaw::desc()],
        shader,
        sample_count,
    )
}

/// Shared pipeline construction.
///
/// Without a colour format the pipeline has no fragment stage and only writes
/// depth, which is what the shadow pass needs. `sample_count` has to match
/// the attachments of the pass the pipeline is used in.
#[allow(clippy::too_many_arguments)]
pub fn mk_render_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    label: &str,
    color_format: Option<wgpu::TextureFormat>,
    blend: Option<wgpu::BlendState>,
    depth: Option<DepthMode>,
    topology: wgpu::PrimitiveTopology,
    cull_mode: Option<wgpu::Face>,
    vertex_layouts: &[wgpu::VertexBufferLayout],
    shader: wgpu::ShaderModuleDescriptor,
    sample_count: u32,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(shader);
    let targets = color_format.map(|format| {
        [Some(wgpu::ColorTargetState {
            format,
            blend,
            write_mask: wgpu::ColorWrites::ALL,
        })]
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: vertex_layouts,
            compilation_options: Default::default(),
        },
        fragment: targets.as_ref().map(|targets| wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets,
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: depth.map(|mode| wgpu::DepthStencilState {
            format: Texture::DEPTH_FORMAT,
            depth_write_enabled: mode.write,
            depth_compare: mode.compare,
            stencil: wgpu::StencilState::default(),
            bias: mode.bias,
        }),
        multisample: wgpu::MultisampleState {
            count: sample_count,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
    })
}
