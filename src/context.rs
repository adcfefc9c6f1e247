//! GPU and window context.
//!
//! [`Context`] owns everything that lives as long as the window: surface,
//! device and queue, the camera, lights, environment, pipelines and the
//! static parts of the scene (ground and helpers). The active floor model is
//! not part of it; see [`crate::active_model`].

use std::sync::Arc;

use anyhow::Context as _;
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::{
    camera::{Camera, CameraResources, OrbitControls, Projection},
    config::ViewerConfig,
    data_structures::{
        helpers::{LineVertex, axes_vertices, grid_vertices},
        scene_graph::SceneModel,
        texture::Texture,
    },
    pipelines::{Pipelines, light::LightResources, sky::EnvironmentResources},
    resources::{scene::ground_plane, texture::material_layout},
};

/// Largest environment panorama side uploaded to the GPU.
const MAX_ENVIRONMENT_DIMENSION: u32 = 4096;

/// Samples per pixel of the main pass when antialiasing is on.
pub const MSAA_SAMPLES: u32 = 4;

/// Grid and axes, uploaded once.
#[derive(Debug)]
pub struct HelperLines {
    pub buffer: wgpu::Buffer,
    pub count: u32,
}

impl HelperLines {
    fn new(device: &wgpu::Device, vertices: &[LineVertex]) -> Option<Self> {
        if vertices.is_empty() {
            return None;
        }
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Helper Lines Buffer"),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        Some(Self {
            buffer,
            count: vertices.len() as u32,
        })
    }
}

#[derive(Debug)]
pub struct Context {
    pub(crate) window: Arc<Window>,
    pub(crate) depth_texture: Texture,
    /// Multisampled colour target resolved into the frame, `None` when the
    /// main pass renders single-sampled.
    pub(crate) msaa_view: Option<wgpu::TextureView>,
    pub sample_count: u32,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub camera: CameraResources,
    pub projection: Projection,
    pub light: LightResources,
    pub environment: EnvironmentResources,
    pub material_layout: wgpu::BindGroupLayout,
    pub pipelines: Pipelines,
    pub clear_colour: wgpu::Color,
    pub helpers: Option<HelperLines>,
    pub ground: Option<SceneModel>,
    pub viewer: ViewerConfig,
}

impl Context {
    pub async fn new(window: Arc<Window>, viewer: ViewerConfig) -> anyhow::Result<Self> {
        let size = window.inner_size();

        log::info!("WGPU setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("creating the window surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no suitable graphics adapter")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                // WebGL doesn't support all of wgpu's features, so if
                // we're building for the web we'll have to disable some.
                required_limits: if cfg!(target_arch = "wasm32") {
                    wgpu::Limits::downlevel_webgl2_defaults().using_resolution(adapter.limits())
                } else {
                    wgpu::Limits::default().using_resolution(adapter.limits())
                },
                memory_hints: Default::default(),
                experimental_features: Default::default(),
                trace: Default::default(),
            })
            .await
            .context("requesting the graphics device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        // Shaders write linear colour and rely on an sRGB surface for encoding.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("the surface supports no texture formats")?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let projection = Projection::new(
            config.width,
            config.height,
            cgmath::Deg(viewer.camera.fov_y),
            viewer.camera.near,
            viewer.camera.far,
        );
        let camera = Camera::new(viewer.camera.position, viewer.camera.target);
        let controls = OrbitControls::from_config(&viewer.controls, viewer.camera.target);
        let camera = CameraResources::new(&device, camera, controls, &projection);

        let sample_count = choose_sample_count(
            viewer.renderer.antialias,
            adapter.get_texture_format_features(config.format).flags,
            adapter.get_texture_format_features(Texture::DEPTH_FORMAT).flags,
        );
        log::info!("Main pass uses {sample_count} sample(s) per pixel");
        let depth_texture = Texture::create_depth_texture(
            &device,
            [config.width, config.height],
            sample_count,
            "depth_texture",
        );
        let msaa_view = create_msaa_view(&device, &config, sample_count);

        let light = LightResources::new(&device, &viewer);
        let environment = EnvironmentResources::new(
            &device,
            &queue,
            &viewer.environment,
            viewer.renderer.exposure,
        );
        let material_layout = material_layout(&device);
        let pipelines = Pipelines::new(
            &device,
            config.format,
            sample_count,
            &material_layout,
            &camera.bind_group_layout,
            &light,
            &environment,
        );

        let mut lines = Vec::new();
        if viewer.helpers.grid {
            lines.extend(grid_vertices(
                viewer.helpers.grid_size,
                viewer.helpers.grid_divisions,
                viewer.helpers.grid_opacity,
            ));
        }
        if viewer.helpers.axes {
            lines.extend(axes_vertices(viewer.helpers.axes_size));
        }
        let helpers = HelperLines::new(&device, &lines);

        let ground = if viewer.ground.enabled {
            let mut ground = SceneModel::upload(
                &device,
                &queue,
                &material_layout,
                ground_plane(&viewer.ground),
            )?;
            ground.set_shadows(false, true);
            ground.write_to_buffers(&queue);
            Some(ground)
        } else {
            None
        };

        let [r, g, b, a] = viewer.renderer.clear_colour;
        let clear_colour = wgpu::Color { r, g, b, a };

        Ok(Self {
            window,
            depth_texture,
            msaa_view,
            sample_count,
            surface,
            device,
            queue,
            config,
            camera,
            projection,
            light,
            environment,
            material_layout,
            pipelines,
            clear_colour,
            helpers,
            ground,
            viewer,
        })
    }

    /// Rebuild the size-dependent attachments after the surface changed.
    pub(crate) fn recreate_targets(&mut self) {
        self.depth_texture = Texture::create_depth_texture(
            &self.device,
            [self.config.width, self.config.height],
            self.sample_count,
            "depth_texture",
        );
        self.msaa_view = create_msaa_view(&self.device, &self.config, self.sample_count);
    }

    pub fn max_environment_dimension(&self) -> u32 {
        self.device
            .limits()
            .max_texture_dimension_2d
            .min(MAX_ENVIRONMENT_DIMENSION)
    }
}

fn create_msaa_view(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    sample_count: u32,
) -> Option<wgpu::TextureView> {
    if sample_count <= 1 {
        return None;
    }
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("msaa_target"),
        size: wgpu::Extent3d {
            width: config.width.max(1),
            height: config.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count,
        dimension: wgpu::TextureDimension::D2,
        format: config.format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    Some(texture.create_view(&wgpu::TextureViewDescriptor::default()))
}

/// Sample count of the main pass: [`MSAA_SAMPLES`] when antialiasing is
/// asked for and both attachment formats can be multisampled, otherwise 1.
pub fn choose_sample_count(
    antialias: bool,
    color: wgpu::TextureFormatFeatureFlags,
    depth: wgpu::TextureFormatFeatureFlags,
) -> u32 {
    let supported = color.sample_count_supported(MSAA_SAMPLES)
        && color.contains(wgpu::TextureFormatFeatureFlags::MULTISAMPLE_RESOLVE)
        && depth.sample_count_supported(MSAA_SAMPLES);
    if antialias && supported { MSAA_SAMPLES } else { 1 }
}

/// Shrink a drawable size so that neither side exceeds `max`, keeping the
/// aspect ratio.
pub fn fit_to_limit(width: u32, height: u32, max: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max {
        return (width, height);
    }
    let scale = max as f64 / longest as f64;
    let shrink = |side: u32| ((side as f64 * scale).round() as u32).clamp(1, max);
    (shrink(width), shrink(height))
}

/// Apply a new drawable size to the surface configuration and projection.
///
/// Zero sizes happen while minimised or before the canvas is laid out and
/// are ignored. Returns whether anything changed.
pub fn fit_viewport(
    config: &mut wgpu::SurfaceConfiguration,
    projection: &mut Projection,
    width: u32,
    height: u32,
) -> bool {
    if width == 0 || height == 0 {
        return false;
    }
    config.width = width;
    config.height = height;
    projection.resize(width, height);
    true
}
