//! Environment map: scene background and image-based ambient term.
//!
//! Until the panorama has loaded a 1x1 black placeholder is bound and the
//! `has_map` flag keeps both the sky pass and the lit shader from using it.

use image::Rgba32FImage;
use wgpu::util::DeviceExt;

use crate::{
    config::EnvironmentConfig,
    data_structures::texture::Texture,
    pipelines::basic::{DepthMode, mk_render_pipeline},
};

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct EnvironmentUniform {
    /// x: background intensity, y: environment intensity, z: exposure, w: map loaded
    pub params: [f32; 4],
}

impl EnvironmentUniform {
    pub fn new(config: &EnvironmentConfig, exposure: f32, has_map: bool) -> Self {
        Self {
            params: [
                config.background_intensity,
                config.environment_intensity,
                exposure,
                if has_map { 1.0 } else { 0.0 },
            ],
        }
    }

    pub fn has_map(&self) -> bool {
        self.params[3] > 0.5
    }

    pub fn exposure(&self) -> f32 {
        self.params[2]
    }
}

#[derive(Debug)]
pub struct EnvironmentResources {
    pub uniform: EnvironmentUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group_layout: wgpu::BindGroupLayout,
    pub bind_group: wgpu::BindGroup,
    texture: Texture,
}

impl EnvironmentResources {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        config: &EnvironmentConfig,
        exposure: f32,
    ) -> Self {
        let uniform = EnvironmentUniform::new(config, exposure, false);
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Environment Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        // Rgba32Float is not filterable on every backend
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::NonFiltering),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
            label: Some("environment_bind_group_layout"),
        });

        let placeholder = Rgba32FImage::from_pixel(1, 1, image::Rgba([0.0, 0.0, 0.0, 1.0]));
        let texture = Texture::from_hdr(device, queue, &placeholder, "environment placeholder");
        let bind_group = mk_bind_group(device, &bind_group_layout, &texture, &buffer);

        Self {
            uniform,
            buffer,
            bind_group_layout,
            bind_group,
            texture,
        }
    }

    pub fn has_map(&self) -> bool {
        self.uniform.has_map()
    }

    /// Replace the placeholder with a decoded panorama.
    pub fn set_map(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, panorama: &Rgba32FImage) {
        let texture = Texture::from_hdr(device, queue, panorama, "environment map");
        self.bind_group = mk_bind_group(device, &self.bind_group_layout, &texture, &self.buffer);
        self.texture.destroy();
        self.texture = texture;
        self.uniform.params[3] = 1.0;
        self.write(queue);
    }

    pub fn set_exposure(&mut self, queue: &wgpu::Queue, exposure: f32) {
        if self.uniform.params[2] != exposure {
            self.uniform.params[2] = exposure;
            self.write(queue);
        }
    }

    fn write(&self, queue: &wgpu::Queue) {
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}

fn mk_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    texture: &Texture,
    buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&texture.view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(texture.sampler()),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: buffer.as_entire_binding(),
            },
        ],
        label: Some("environment_bind_group"),
    })
}

/// Fullscreen sky drawn first in the main pass. Group 0 camera, group 1
/// environment.
pub fn mk_sky_pipeline(
    device: &wgpu::Device,
    color_format: wgpu::TextureFormat,
    sample_count: u32,
    camera_layout: &wgpu::BindGroupLayout,
    environment_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Sky Pipeline Layout"),
        bind_group_layouts: &[camera_layout, environment_layout],
        push_constant_ranges: &[],
    });
    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Sky Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("sky.wgsl").into()),
    };
    mk_render_pipeline(
        device,
        &layout,
        "Sky Pipeline",
        Some(color_format),
        Some(wgpu::BlendState::REPLACE),
        Some(DepthMode::BACKGROUND),
        wgpu::PrimitiveTopology::TriangleList,
        None,
        &[],
        shader,
        sample_count,
    )
}
