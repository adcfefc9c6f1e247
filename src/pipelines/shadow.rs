use crate::{
    data_structures::{
        instance::InstanceRaw,
        model::{ModelVertex, Vertex},
    },
    pipelines::basic::{DepthMode, mk_render_pipeline},
};

/// Depth-only pipeline rendering shadow casters from the directional light
/// into the shadow map. Bind group 0 is the light uniform.
pub fn mk_shadow_pipeline(
    device: &wgpu::Device,
    light_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Shadow Pipeline Layout"),
        bind_group_layouts: &[light_layout],
        push_constant_ranges: &[],
    });
    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Shadow Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("shadow.wgsl").into()),
    };
    mk_render_pipeline(
        device,
        &layout,
        "Shadow Pipeline",
        None,
        None,
        Some(DepthMode {
            write: true,
            compare: wgpu::CompareFunction::LessEqual,
            bias: wgpu::DepthBiasState {
                constant: 2,
                slope_scale: 2.0,
                clamp: 0.0,
            },
        }),
        wgpu::PrimitiveTopology::TriangleList,
        None,
        &[ModelVertex::desc(), InstanceRaw::desc()],
        shader,
        1,
    )
}
