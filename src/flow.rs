//! Frame driver and application event loop.
//!
//! The event loop owns one [`AppState`]: the GPU [`Context`], the active
//! model slot, the floor menu, the egui overlay and the [`FrameDriver`].
//! Background work (model decodes, the environment fetch) runs on tokio
//! natively and on `spawn_local` in the browser, and reports back through
//! [`FlowEvent`]s sent to the event loop proxy.
//!
//! # Lifecycle
//!
//! Each redraw:
//! 1. Compute the time since the previous frame
//! 2. Advance the orbit controls, then every registered [`FrameUpdate`]
//! 3. Upload camera, light and environment uniforms
//! 4. Shadow pass, main pass (sky, ground and model, helpers), overlay pass
//! 5. Present and apply the overlay's menu clicks

use std::{fmt::Debug, iter, sync::Arc};

use image::Rgba32FImage;
use instant::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalPosition,
    event::{ElementState, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    window::Window,
};

use crate::{
    active_model::{LoadTicket, ModelSlot, Resolution},
    camera::{Camera, OrbitControls},
    config::ViewerConfig,
    context::{Context, fit_to_limit, fit_viewport},
    data_structures::scene_graph::SceneModel,
    menu::{ClickTarget, FloorMenu},
    pick::{self, PickOutcome},
    render::{Instanced, Render, draw_lit, draw_shadow_casters},
    resources::{environment::load_environment, scene::DecodedScene, scene::load_gltf},
    ui::{Overlay, PanelState},
};

/// Per-frame callback advanced by the [`FrameDriver`].
///
/// Updates run on the render thread after the orbit controls and before any
/// drawing. They cannot fail; a panic ends the event loop.
pub trait FrameUpdate {
    fn update(&mut self, dt: Duration);
}

/// Frame timing plus the ordered registry of per-frame updates.
pub struct FrameDriver {
    last_time: Instant,
    updates: Vec<Box<dyn FrameUpdate>>,
}

impl Debug for FrameDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameDriver")
            .field("last_time", &self.last_time)
            .field("updates", &self.updates.len())
            .finish()
    }
}

impl Default for FrameDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDriver {
    pub fn new() -> Self {
        Self {
            last_time: Instant::now(),
            updates: Vec::new(),
        }
    }

    /// Append an update. Updates run in registration order.
    pub fn register(&mut self, update: Box<dyn FrameUpdate>) {
        self.updates.push(update);
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    /// Time since the previous call (or since creation).
    pub fn tick(&mut self) -> Duration {
        let now = Instant::now();
        let dt = now - self.last_time;
        self.last_time = now;
        dt
    }

    /// Advance the controls, then every registered update, by `dt`. Returns
    /// whether the camera moved.
    pub fn advance(&mut self, controls: &mut OrbitControls, camera: &mut Camera, dt: Duration) -> bool {
        let moved = controls.update(camera, dt);
        for update in self.updates.iter_mut() {
            update.update(dt);
        }
        moved
    }
}

/// Application state bundle: GPU context, active model, menu and overlay.
#[derive(Debug)]
pub struct AppState {
    pub(crate) ctx: Context,
    pub(crate) active: ModelSlot<SceneModel>,
    menu: FloorMenu,
    overlay: Overlay,
    pub driver: FrameDriver,
    cursor: Option<PhysicalPosition<f64>>,
    is_surface_configured: bool,
}

impl AppState {
    async fn new(window: Arc<Window>, viewer: ViewerConfig) -> anyhow::Result<Self> {
        let ctx = Context::new(window, viewer).await?;
        let overlay = Overlay::new(&ctx.window, &ctx.device, ctx.config.format);
        Ok(Self {
            ctx,
            active: ModelSlot::new(),
            menu: FloorMenu::new(),
            overlay,
            driver: FrameDriver::new(),
            cursor: None,
            is_surface_configured: false,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        let max = self.ctx.device.limits().max_texture_dimension_2d;
        let (width, height) = fit_to_limit(width, height, max);
        if fit_viewport(&mut self.ctx.config, &mut self.ctx.projection, width, height) {
            self.is_surface_configured = true;
            self.ctx
                .surface
                .configure(&self.ctx.device, &self.ctx.config);
            self.ctx.recreate_targets();
        }
    }

    /// Steps 1 to 3 of the frame: time, controls and updates, uniforms.
    fn advance(&mut self) {
        let dt = self.driver.tick();
        let camera = &mut self.ctx.camera;
        self.driver
            .advance(&mut camera.controls, &mut camera.camera, dt);
        camera.write_to_buffer(&self.ctx.queue, &self.ctx.projection);
        self.ctx.light.update(&self.ctx.queue);
        self.ctx
            .environment
            .set_exposure(&self.ctx.queue, self.ctx.viewer.renderer.exposure);
        if let Some(model) = self.active.current_mut() {
            model.write_to_buffers(&self.ctx.queue);
        }
    }

    fn render(&mut self) -> Result<Vec<ClickTarget>, wgpu::SurfaceError> {
        // invoke main render loop
        self.ctx.window.request_redraw();

        // Rendering requires the surface to be configured
        if !self.is_surface_configured {
            return Ok(Vec::new());
        }

        let output = self.ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut items: Vec<Instanced> = Vec::new();
            if let Some(ground) = &self.ctx.ground {
                Render::from(ground).flatten(&mut items);
            }
            if let Some(model) = self.active.current() {
                Render::from(model).flatten(&mut items);
            }

            if self.ctx.light.shadow.enabled {
                let mut shadow_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Shadow Pass"),
                    color_attachments: &[],
                    depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                        view: &self.ctx.light.shadow_map.view,
                        depth_ops: Some(wgpu::Operations {
                            load: wgpu::LoadOp::Clear(1.0),
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    }),
                    occlusion_query_set: None,
                    timestamp_writes: None,
                });
                shadow_pass.set_pipeline(&self.ctx.pipelines.shadow);
                shadow_pass.set_bind_group(0, &self.ctx.light.shadow_bind_group, &[]);
                draw_shadow_casters(&mut shadow_pass, &items);
            }

            // multisampled frames are resolved into the surface texture
            let (target, resolve_target, store) = match &self.ctx.msaa_view {
                Some(msaa) => (msaa, Some(&view), wgpu::StoreOp::Discard),
                None => (&view, None, wgpu::StoreOp::Store),
            };
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.ctx.clear_colour),
                        store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.ctx.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            if self.ctx.environment.has_map() {
                render_pass.set_pipeline(&self.ctx.pipelines.sky);
                render_pass.set_bind_group(0, &self.ctx.camera.bind_group, &[]);
                render_pass.set_bind_group(1, &self.ctx.environment.bind_group, &[]);
                render_pass.draw(0..3, 0..1);
            }

            render_pass.set_pipeline(&self.ctx.pipelines.lit);
            render_pass.set_bind_group(1, &self.ctx.camera.bind_group, &[]);
            render_pass.set_bind_group(2, &self.ctx.light.bind_group, &[]);
            render_pass.set_bind_group(3, &self.ctx.environment.bind_group, &[]);
            draw_lit(&mut render_pass, &items);

            if let Some(helpers) = &self.ctx.helpers {
                render_pass.set_pipeline(&self.ctx.pipelines.lines);
                render_pass.set_bind_group(0, &self.ctx.camera.bind_group, &[]);
                render_pass.set_vertex_buffer(0, helpers.buffer.slice(..));
                render_pass.draw(0..helpers.count, 0..1);
            }
        }

        let clicks = self.overlay.render(
            &self.ctx.window,
            &self.ctx.device,
            &self.ctx.queue,
            &mut encoder,
            &view,
            [self.ctx.config.width, self.ctx.config.height],
            PanelState {
                light: &mut self.ctx.light.settings,
                exposure: &mut self.ctx.viewer.renderer.exposure,
            },
            &self.menu,
        );

        self.ctx.queue.submit(iter::once(encoder.finish()));
        output.present();
        Ok(clicks)
    }

    /// Cast a ray through the cursor and log the first ground or model hit.
    fn pick(&self, position: PhysicalPosition<f64>) -> PickOutcome {
        let ray = self.ctx.camera.camera.cast_ray_from_mouse(
            position,
            self.ctx.config.width as f32,
            self.ctx.config.height as f32,
            &self.ctx.projection,
        );
        let ground = self.ctx.ground.iter().flat_map(|ground| ground.triangles());
        let model = self.active.current().into_iter().flat_map(|model| model.triangles());
        pick::report(&ray, ground.chain(model))
    }
}

pub(crate) enum FlowEvent {
    #[cfg(target_arch = "wasm32")]
    Initialized { state: Box<AppState> },
    /// A floor control asked for a model.
    Load(String),
    Decoded {
        ticket: LoadTicket,
        result: anyhow::Result<DecodedScene>,
    },
    Environment(anyhow::Result<Rgba32FImage>),
}

impl Debug for FlowEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            #[cfg(target_arch = "wasm32")]
            Self::Initialized { .. } => f.write_str("Initialized"),
            Self::Load(path) => f.debug_tuple("Load").field(path).finish(),
            Self::Decoded { ticket, result } => f
                .debug_struct("Decoded")
                .field("ticket", ticket)
                .field("ok", &result.is_ok())
                .finish(),
            Self::Environment(result) => f
                .debug_tuple("Environment")
                .field(&result.is_ok())
                .finish(),
        }
    }
}

pub struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    proxy: EventLoopProxy<FlowEvent>,
    state: Option<AppState>,
    initializing: bool,
    init_error: Option<anyhow::Error>,
}

impl App {
    fn new(event_loop: &EventLoop<FlowEvent>) -> anyhow::Result<Self> {
        let proxy = event_loop.create_proxy();
        #[cfg(not(target_arch = "wasm32"))]
        let async_runtime = tokio::runtime::Runtime::new()?;
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime,
            proxy,
            state: None,
            initializing: false,
            init_error: None,
        })
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.async_runtime.spawn(fut);
    }

    #[cfg(target_arch = "wasm32")]
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + 'static,
    {
        wasm_bindgen_futures::spawn_local(fut);
    }

    /// First frame setup once the state exists: fit the surface, start the
    /// environment fetch and load the default floor.
    fn start(&mut self, mut state: AppState) {
        let size = state.ctx.window.inner_size();
        state.resize(size.width, size.height);

        let path = state.ctx.viewer.environment.path.clone();
        let max_dimension = state.ctx.max_environment_dimension();
        let default_model = state.ctx.viewer.default_model.clone();
        let window = state.ctx.window.clone();
        self.state = Some(state);

        if path.is_empty() {
            log::info!("No environment map configured");
        } else {
            let proxy = self.proxy.clone();
            self.spawn(async move {
                let result = load_environment(&path, max_dimension).await;
                if proxy.send_event(FlowEvent::Environment(result)).is_err() {
                    log::warn!("Event loop closed before the environment map arrived");
                }
            });
        }

        self.load_model(&default_model);
        window.request_redraw();
    }

    /// Dispose the current model and start decoding `path`. Only the result
    /// of the latest call is ever attached.
    pub(crate) fn load_model(&mut self, path: &str) {
        let Some(state) = &mut self.state else {
            log::warn!("Cannot load {path} before initialization");
            return;
        };
        let ticket = state.active.request(path);
        self.spawn_decode(ticket);
    }

    fn spawn_decode(&self, ticket: LoadTicket) {
        let proxy = self.proxy.clone();
        self.spawn(async move {
            let result = load_gltf(ticket.path()).await;
            if proxy.send_event(FlowEvent::Decoded { ticket, result }).is_err() {
                log::warn!("Event loop closed before a decode finished");
            }
        });
    }

    fn click(&mut self, target: ClickTarget) {
        let Some(state) = &mut self.state else {
            return;
        };
        if let Some(ticket) = state.menu.dispatch(target, &mut state.active) {
            self.spawn_decode(ticket);
        }
    }
}

impl ApplicationHandler<FlowEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() || self.initializing {
            return;
        }
        self.initializing = true;

        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes().with_title("floor-viewer");

        #[cfg(target_arch = "wasm32")]
        {
            use winit::platform::web::WindowAttributesExtWebSys;

            match find_canvas() {
                Ok(canvas) => window_attributes = window_attributes.with_canvas(Some(canvas)),
                Err(e) => {
                    log::error!("{e:#}");
                    self.init_error = Some(e);
                    event_loop.exit();
                    return;
                }
            }
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                self.init_error = Some(e.into());
                event_loop.exit();
                return;
            }
        };

        let init_future = async move {
            let viewer = ViewerConfig::load().await;
            AppState::new(window, viewer).await
        };

        #[cfg(not(target_arch = "wasm32"))]
        {
            match self.async_runtime.block_on(init_future) {
                Ok(state) => self.start(state),
                Err(e) => {
                    log::error!("App initialization failed: {e:#}");
                    self.init_error = Some(e);
                    event_loop.exit();
                }
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                match init_future.await {
                    Ok(state) => {
                        let state = Box::new(state);
                        if proxy.send_event(FlowEvent::Initialized { state }).is_err() {
                            log::error!("Event loop closed during initialization");
                        }
                    }
                    Err(e) => log::error!("App initialization failed: {e:#}"),
                }
            });
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: FlowEvent) {
        match event {
            #[cfg(target_arch = "wasm32")]
            FlowEvent::Initialized { state } => {
                // This is the message from our wasm `spawn_local`
                let mut state = *state;
                let wired = crate::dom::wire_dom_controls(self.proxy.clone());
                state.overlay.set_floor_bar(!wired);
                self.start(state);
            }
            FlowEvent::Load(path) => self.load_model(&path),
            FlowEvent::Decoded { ticket, result } => {
                let Some(state) = &mut self.state else {
                    return;
                };
                let ctx = &state.ctx;
                let resolution = state.active.resolve_with(ticket, result, |scene| {
                    SceneModel::upload(&ctx.device, &ctx.queue, &ctx.material_layout, scene)
                });
                if resolution == Resolution::Attached {
                    if let Some(model) = state.active.current() {
                        log::info!("{} has {} meshes", model.name, model.mesh_count());
                    }
                }
            }
            FlowEvent::Environment(result) => {
                let Some(state) = &mut self.state else {
                    return;
                };
                match result {
                    Ok(panorama) => {
                        state
                            .ctx
                            .environment
                            .set_map(&state.ctx.device, &state.ctx.queue, &panorama);
                        log::info!(
                            "Environment map ready ({}x{})",
                            panorama.width(),
                            panorama.height()
                        );
                    }
                    Err(e) => log::error!("Environment map unavailable: {e:#}"),
                }
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };

        let consumed = state.overlay.handle_event(&state.ctx.window, &event);

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => state.resize(size.width, size.height),
            WindowEvent::RedrawRequested => {
                state.advance();
                match state.render() {
                    Ok(clicks) => {
                        for click in clicks {
                            self.click(click);
                        }
                    }
                    // Reconfigure the surface if it's lost or outdated
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let size = state.ctx.window.inner_size();
                        state.resize(size.width, size.height);
                    }
                    Err(e) => {
                        log::error!("Unable to render {}", e);
                    }
                }
            }
            _ => {
                if let WindowEvent::CursorMoved { position, .. } = event {
                    state.cursor = Some(position);
                }
                // releases and motion always reach the controls so drags end cleanly
                let passthrough = matches!(
                    event,
                    WindowEvent::CursorMoved { .. }
                        | WindowEvent::CursorLeft { .. }
                        | WindowEvent::MouseInput {
                            state: ElementState::Released,
                            ..
                        }
                );
                if consumed && !passthrough {
                    return;
                }
                let height = state.ctx.config.height as f32;
                let camera = &mut state.ctx.camera;
                camera.controls.handle_window_events(
                    &event,
                    &camera.camera,
                    &state.ctx.projection,
                    height,
                );

                if let WindowEvent::MouseInput {
                    state: ElementState::Pressed,
                    ..
                } = event
                {
                    if let Some(position) = state.cursor {
                        if !state.overlay.wants_pointer() {
                            state.pick(position);
                        }
                    }
                }
            }
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn find_canvas() -> anyhow::Result<web_sys::HtmlCanvasElement> {
    use anyhow::Context as _;
    use wasm_bindgen::JsCast;

    const CANVAS_ID: &str = "canvas";

    web_sys::window()
        .and_then(|window| window.document())
        .context("no document to attach to")?
        .get_element_by_id(CANVAS_ID)
        .with_context(|| format!("the page has no #{CANVAS_ID} element"))?
        .dyn_into()
        .map_err(|_| anyhow::anyhow!("#{CANVAS_ID} is not a canvas"))
}

/// Build the event loop and run the viewer until the window closes.
pub fn run() -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        if console_log::init_with_level(log::Level::Info).is_err() {
            web_sys::console::warn_1(&"Logger already initialized".into());
        }
    }

    let event_loop: EventLoop<FlowEvent> = EventLoop::with_user_event().build()?;

    let mut app = App::new(&event_loop)?;

    event_loop.run_app(&mut app)?;

    match app.init_error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
