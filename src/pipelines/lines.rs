use crate::{
    data_structures::{helpers::LineVertex, model::Vertex},
    pipelines::basic::{DepthMode, mk_render_pipeline},
};

/// Alpha-blended line list for the grid and axes helpers.
pub fn mk_lines_pipeline(
    device: &wgpu::Device,
    color_format: wgpu::TextureFormat,
    sample_count: u32,
    camera_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Lines Pipeline Layout"),
        bind_group_layouts: &[camera_layout],
        push_constant_ranges: &[],
    });
    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Lines Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("lines.wgsl").into()),
    };
    mk_render_pipeline(
        device,
        &layout,
        "Lines Pipeline",
        Some(color_format),
        Some(wgpu::BlendState::ALPHA_BLENDING),
        Some(DepthMode::OVERLAY),
        wgpu::PrimitiveTopology::LineList,
        None,
        &[LineVertex::desc()],
        shader,
        sample_count,
    )
}
