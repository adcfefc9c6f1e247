use anyhow::Context as _;
use image::{ImageFormat, RgbaImage};

/// Bind group layout of a mesh material: base colour, normal map and the
/// material uniform.
pub fn material_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    let texture_entry = |binding| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            multisampled: false,
            view_dimension: wgpu::TextureViewDimension::D2,
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
        },
        count: None,
    };
    let sampler_entry = |binding| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    };
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            texture_entry(0),
            sampler_entry(1),
            texture_entry(2),
            sampler_entry(3),
            wgpu::BindGroupLayoutEntry {
                binding: 4,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ],
        label: Some("material_bind_group_layout"),
    })
}

/// Decode an embedded or external image into RGBA8.
///
/// The mime type is a hint; without one the format is guessed from the bytes.
pub fn decode_image(bytes: &[u8], mime_type: Option<&str>) -> anyhow::Result<RgbaImage> {
    let img = match mime_type.and_then(ImageFormat::from_mime_type) {
        Some(format) => image::load_from_memory_with_format(bytes, format)
            .with_context(|| format!("decoding {}", format.to_mime_type()))?,
        None => image::load_from_memory(bytes).context("decoding image of unknown format")?,
    };
    Ok(img.to_rgba8())
}
