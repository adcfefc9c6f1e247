//! Ambient and directional light, and the shadow map of the latter.
//!
//! The directional light shines from [`LightSettings::position`] towards the
//! origin. Its shadow camera is orthographic and covers a square of
//! `2 * extent` world units around the origin.

use cgmath::{InnerSpace, Matrix4, Point3, Vector3};
use wgpu::util::DeviceExt;

use crate::{
    camera::OPENGL_TO_WGPU_MATRIX,
    config::{ViewerConfig, hex_to_linear},
    data_structures::texture::Texture,
};

/// Light parameters editable at runtime through the debug panel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightSettings {
    pub ambient_color: u32,
    pub ambient_intensity: f32,
    pub color: u32,
    pub intensity: f32,
    pub position: [f32; 3],
}

impl From<&ViewerConfig> for LightSettings {
    fn from(config: &ViewerConfig) -> Self {
        Self {
            ambient_color: config.ambient_light.color,
            ambient_intensity: config.ambient_light.intensity,
            color: config.directional_light.color,
            intensity: config.directional_light.intensity,
            position: config.directional_light.position,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShadowSettings {
    pub enabled: bool,
    pub extent: f32,
    pub near: f32,
    pub far: f32,
    pub map_size: u32,
    pub bias: f32,
}

impl From<&ViewerConfig> for ShadowSettings {
    fn from(config: &ViewerConfig) -> Self {
        let light = &config.directional_light;
        Self {
            enabled: config.renderer.shadows && light.cast_shadow,
            extent: light.shadow_extent,
            near: light.shadow_near,
            far: light.shadow_far,
            map_size: light.shadow_map_size,
            bias: light.shadow_bias,
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    ambient: [f32; 4],
    color: [f32; 4],
    position: [f32; 4],
    view_proj: [[f32; 4]; 4],
    // x: bias, y: texel size, z: enabled
    shadow: [f32; 4],
}

impl LightUniform {
    pub fn new(settings: &LightSettings, shadow: &ShadowSettings) -> Self {
        let scale = |rgb: [f32; 3], intensity: f32| {
            [rgb[0] * intensity, rgb[1] * intensity, rgb[2] * intensity, 1.0]
        };
        let [x, y, z] = settings.position;
        Self {
            ambient: scale(hex_to_linear(settings.ambient_color), settings.ambient_intensity),
            color: scale(hex_to_linear(settings.color), settings.intensity),
            position: [x, y, z, 1.0],
            view_proj: light_view_proj(settings.position, shadow).into(),
            shadow: [
                shadow.bias,
                1.0 / shadow.map_size.max(1) as f32,
                if shadow.enabled { 1.0 } else { 0.0 },
                0.0,
            ],
        }
    }

    pub fn ambient(&self) -> [f32; 3] {
        [self.ambient[0], self.ambient[1], self.ambient[2]]
    }

    pub fn color(&self) -> [f32; 3] {
        [self.color[0], self.color[1], self.color[2]]
    }

    pub fn shadows_enabled(&self) -> bool {
        self.shadow[2] > 0.5
    }
}

/// Orthographic view-projection of the shadow camera.
pub fn light_view_proj(position: [f32; 3], shadow: &ShadowSettings) -> Matrix4<f32> {
    let eye = Point3::from(position);
    let forward = Point3::new(0.0, 0.0, 0.0) - eye;
    let up = if forward.normalize().y.abs() > 0.999 {
        Vector3::unit_z()
    } else {
        Vector3::unit_y()
    };
    let view = Matrix4::look_at_rh(eye, Point3::new(0.0, 0.0, 0.0), up);
    let e = shadow.extent;
    let projection = cgmath::ortho(-e, e, -e, e, shadow.near, shadow.far);
    OPENGL_TO_WGPU_MATRIX * projection * view
}

#[derive(Debug)]
pub struct LightResources {
    pub settings: LightSettings,
    pub shadow: ShadowSettings,
    pub uniform: LightUniform,
    pub buffer: wgpu::Buffer,
    /// Uniform plus shadow map, used by the lit pipeline.
    pub bind_group_layout: wgpu::BindGroupLayout,
    pub bind_group: wgpu::BindGroup,
    /// Uniform only, used by the shadow pipeline which writes the map.
    pub shadow_bind_group_layout: wgpu::BindGroupLayout,
    pub shadow_bind_group: wgpu::BindGroup,
    pub shadow_map: Texture,
}

impl LightResources {
    pub fn new(device: &wgpu::Device, config: &ViewerConfig) -> Self {
        let settings = LightSettings::from(config);
        let mut shadow = ShadowSettings::from(config);
        let max_size = device.limits().max_texture_dimension_2d;
        if shadow.map_size > max_size {
            log::warn!(
                "Shadow map size {} exceeds the device limit, using {}",
                shadow.map_size,
                max_size
            );
            shadow.map_size = max_size;
        }
        let uniform = LightUniform::new(&settings, &shadow);

        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Light Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        // A disabled shadow map is still bound, it is just never rendered to.
        let map_size = if shadow.enabled { shadow.map_size } else { 1 };
        let shadow_map = Texture::create_shadow_map(device, map_size);

        let uniform_entry = wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[
                uniform_entry,
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Depth,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                    count: None,
                },
            ],
            label: Some("light_bind_group_layout"),
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&shadow_map.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(shadow_map.sampler()),
                },
            ],
            label: Some("light_bind_group"),
        });

        let shadow_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[wgpu::BindGroupLayoutEntry {
                    visibility: wgpu::ShaderStages::VERTEX,
                    ..uniform_entry
                }],
                label: Some("shadow_bind_group_layout"),
            });
        let shadow_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &shadow_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("shadow_bind_group"),
        });

        Self {
            settings,
            shadow,
            uniform,
            buffer,
            bind_group_layout,
            bind_group,
            shadow_bind_group_layout,
            shadow_bind_group,
            shadow_map,
        }
    }

    /// Recompute the uniform from the current settings and upload it.
    pub fn update(&mut self, queue: &wgpu::Queue) {
        self.uniform = LightUniform::new(&self.settings, &self.shadow);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}
