//! egui overlay: the light debug panel and, when no page markup drives the
//! floor menu, a built-in floor bar with the tower submenu.

use winit::{event::WindowEvent, window::Window};

use crate::{
    menu::{ClickTarget, FLOORS, FloorMenu, TOWER_VARIANTS, variant_label},
    pipelines::light::LightSettings,
};

/// Values the debug panel edits in place.
pub struct PanelState<'a> {
    pub light: &'a mut LightSettings,
    pub exposure: &'a mut f32,
}

pub struct Overlay {
    ctx: egui::Context,
    state: egui_winit::State,
    renderer: egui_wgpu::Renderer,
    show_floor_bar: bool,
}

impl std::fmt::Debug for Overlay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Overlay")
            .field("show_floor_bar", &self.show_floor_bar)
            .finish()
    }
}

impl Overlay {
    pub fn new(window: &Window, device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let ctx = egui::Context::default();
        let state = egui_winit::State::new(
            ctx.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let renderer =
            egui_wgpu::Renderer::new(device, format, egui_wgpu::RendererOptions::default());
        Self {
            ctx,
            state,
            renderer,
            show_floor_bar: true,
        }
    }

    /// Hide the built-in floor bar once page buttons are wired up.
    pub fn set_floor_bar(&mut self, visible: bool) {
        self.show_floor_bar = visible;
    }

    /// Feed a window event to egui. Returns whether egui consumed it.
    pub fn handle_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        self.state.on_window_event(window, event).consumed
    }

    pub fn wants_pointer(&self) -> bool {
        self.ctx.wants_pointer_input() || self.ctx.is_pointer_over_area()
    }

    #[allow(clippy::too_many_arguments)]
    pub fn render(
        &mut self,
        window: &Window,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        size_in_pixels: [u32; 2],
        panel: PanelState<'_>,
        menu: &FloorMenu,
    ) -> Vec<ClickTarget> {
        let mut clicks = Vec::new();
        let show_floor_bar = self.show_floor_bar;
        let PanelState { light, exposure } = panel;

        let raw_input = self.state.take_egui_input(window);
        let full_output = self.ctx.run(raw_input, |ctx| {
            debug_panel(ctx, light, exposure);
            if show_floor_bar {
                floor_bar(ctx, menu, &mut clicks);
            }
        });

        self.state
            .handle_platform_output(window, full_output.platform_output);

        let pixels_per_point = full_output.pixels_per_point;
        let tris = self.ctx.tessellate(full_output.shapes, pixels_per_point);
        for (id, image_delta) in &full_output.textures_delta.set {
            self.renderer.update_texture(device, queue, *id, image_delta);
        }
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels,
            pixels_per_point,
        };
        self.renderer
            .update_buffers(device, queue, encoder, &tris, &screen_descriptor);

        {
            let render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("egui Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            let mut render_pass = render_pass.forget_lifetime();
            self.renderer
                .render(&mut render_pass, &tris, &screen_descriptor);
        }

        for id in &full_output.textures_delta.free {
            self.renderer.free_texture(id);
        }

        clicks
    }
}

/// Edits apply in place; the frame driver uploads the uniforms every frame.
fn debug_panel(ctx: &egui::Context, light: &mut LightSettings, exposure: &mut f32) {
    egui::Window::new("Lighting")
        .anchor(egui::Align2::RIGHT_TOP, egui::vec2(-10.0, 10.0))
        .default_open(false)
        .resizable(false)
        .show(ctx, |ui| {
            ui.heading("Directional");
            colour_row(ui, "Colour", &mut light.color);
            ui.add(
                egui::Slider::new(&mut light.intensity, 0.0..=10.0)
                    .step_by(0.1)
                    .text("Intensity"),
            );
            for (axis, value) in ["X", "Y", "Z"].into_iter().zip(light.position.iter_mut()) {
                ui.add(egui::Slider::new(value, -200.0..=200.0).step_by(1.0).text(axis));
            }

            ui.separator();
            ui.heading("Ambient");
            colour_row(ui, "Colour", &mut light.ambient_color);
            ui.add(
                egui::Slider::new(&mut light.ambient_intensity, 0.0..=5.0)
                    .step_by(0.1)
                    .text("Intensity"),
            );

            ui.separator();
            ui.heading("Renderer");
            ui.add(egui::Slider::new(exposure, 0.1..=5.0).step_by(0.1).text("Exposure"));
        });
}

fn colour_row(ui: &mut egui::Ui, label: &str, hex: &mut u32) {
    ui.horizontal(|ui| {
        ui.label(label);
        let mut rgb = hex_to_bytes(*hex);
        if ui.color_edit_button_srgb(&mut rgb).changed() {
            *hex = bytes_to_hex(rgb);
        }
    });
}

/// Built-in floor bar and tower popup. Pushes the clicks of this frame onto
/// `clicks`, including [`ClickTarget::Elsewhere`] for a click that lands
/// outside the open popup.
pub fn floor_bar(ctx: &egui::Context, menu: &FloorMenu, clicks: &mut Vec<ClickTarget>) {
    // The default egui fonts carry no CJK glyphs, so buttons show the ids and
    // the page labels appear on hover.
    egui::Area::new(egui::Id::new("floor_bar"))
        .anchor(egui::Align2::CENTER_BOTTOM, egui::vec2(0.0, -16.0))
        .show(ctx, |ui| {
            egui::Frame::popup(ui.style()).show(ui, |ui| {
                ui.horizontal(|ui| {
                    for floor in FLOORS.iter() {
                        if ui
                            .button(floor.id.to_uppercase())
                            .on_hover_text(floor.label)
                            .clicked()
                        {
                            clicks.push(ClickTarget::Floor(floor.id));
                        }
                    }
                    if ui
                        .selectable_label(menu.is_tower_open(), "Tower")
                        .clicked()
                    {
                        clicks.push(ClickTarget::TowerToggle);
                    }
                });
            });
        });

    let mut popup_rect = None;
    if menu.is_tower_open() {
        let response = egui::Area::new(egui::Id::new("tower_menu"))
            .anchor(egui::Align2::RIGHT_BOTTOM, egui::vec2(-16.0, -64.0))
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    for (index, asset) in TOWER_VARIANTS.iter().enumerate() {
                        if ui
                            .button(format!("Tower {}", index + 1))
                            .on_hover_text(variant_label(asset))
                            .clicked()
                        {
                            clicks.push(ClickTarget::TowerItem(index));
                        }
                    }
                });
            });
        popup_rect = Some(response.response.rect);
    }

    if menu.is_tower_open() && clicks.is_empty() {
        let outside = ctx.input(|i| {
            closes_tower_menu(i.pointer.primary_clicked(), i.pointer.interact_pos(), popup_rect)
        });
        if outside {
            clicks.push(ClickTarget::Elsewhere);
        }
    }
}

/// Whether a click closes the tower popup: it has to land somewhere other
/// than the popup itself.
pub fn closes_tower_menu(
    clicked: bool,
    pointer: Option<egui::Pos2>,
    popup: Option<egui::Rect>,
) -> bool {
    clicked && pointer.is_some_and(|pos| popup.is_none_or(|rect| !rect.contains(pos)))
}

fn hex_to_bytes(hex: u32) -> [u8; 3] {
    [(hex >> 16) as u8, (hex >> 8) as u8, hex as u8]
}

fn bytes_to_hex([r, g, b]: [u8; 3]) -> u32 {
    ((r as u32) << 16) | ((g as u32) << 8) | b as u32
}
