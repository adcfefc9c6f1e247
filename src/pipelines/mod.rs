//! Render pipelines.
//!
//! - `basic` builds the lit mesh pipeline and the shared pipeline constructor
//! - `light` owns the light uniform and the shadow map
//! - `shadow` is the depth-only pass from the light
//! - `sky` owns the environment map and draws the background
//! - `lines` draws the grid and axes helpers

pub mod basic;
pub mod light;
pub mod lines;
pub mod shadow;
pub mod sky;

use crate::pipelines::{light::LightResources, sky::EnvironmentResources};

/// All pipelines of the viewer, created once at startup.
#[derive(Debug)]
pub struct Pipelines {
    pub lit: wgpu::RenderPipeline,
    pub shadow: wgpu::RenderPipeline,
    pub sky: wgpu::RenderPipeline,
    pub lines: wgpu::RenderPipeline,
}

impl Pipelines {
    /// Everything drawn in the main pass uses `sample_count`; the shadow
    /// pass is always single-sampled.
    pub fn new(
        device: &wgpu::Device,
        color_format: wgpu::TextureFormat,
        sample_count: u32,
        material_layout: &wgpu::BindGroupLayout,
        camera_layout: &wgpu::BindGroupLayout,
        light: &LightResources,
        environment: &EnvironmentResources,
    ) -> Self {
        Self {
            lit: basic::mk_lit_pipeline(
                device,
                color_format,
                sample_count,
                material_layout,
                camera_layout,
                &light.bind_group_layout,
                &environment.bind_group_layout,
            ),
            shadow: shadow::mk_shadow_pipeline(device, &light.shadow_bind_group_layout),
            sky: sky::mk_sky_pipeline(
                device,
                color_format,
                sample_count,
                camera_layout,
                &environment.bind_group_layout,
            ),
            lines: lines::mk_lines_pipeline(device, color_format, sample_count, camera_layout),
        }
    }
}
