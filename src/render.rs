//! Render composition.
//!
//! Scene objects describe themselves as a [`Render`]; the frame driver
//! flattens everything into one list of [`Instanced`] draws and replays it
//! twice: once depth-only from the light for shadow casters, once lit from
//! the camera.

use crate::data_structures::model::{DrawModel, DrawShadow, Model};

/// A model together with the instance buffer that places it in the world.
pub struct Instanced<'a> {
    pub instance: &'a wgpu::Buffer,
    pub model: &'a Model,
    pub amount: usize,
    pub cast_shadow: bool,
}

pub enum Render<'a> {
    None,
    Defaults(Vec<Instanced<'a>>),
}

impl<'a> Render<'a> {
    pub fn flatten(self, out: &mut Vec<Instanced<'a>>) {
        match self {
            Render::None => (),
            Render::Defaults(mut vec) => out.append(&mut vec),
        }
    }
}

/// Draw every item with the lit pipeline. Camera, light and environment
/// groups must already be bound.
pub fn draw_lit(render_pass: &mut wgpu::RenderPass<'_>, items: &[Instanced<'_>]) {
    for instanced in items {
        if instanced.amount == 0 {
            continue;
        }
        render_pass.set_vertex_buffer(1, instanced.instance.slice(..));
        render_pass.draw_model_instanced(instanced.model, 0..instanced.amount as u32);
    }
}

/// Draw every shadow caster with the depth-only pipeline.
pub fn draw_shadow_casters(render_pass: &mut wgpu::RenderPass<'_>, items: &[Instanced<'_>]) {
    for instanced in items.iter().filter(|i| i.cast_shadow && i.amount > 0) {
        render_pass.set_vertex_buffer(1, instanced.instance.slice(..));
        render_pass.draw_model_shadow(instanced.model, 0..instanced.amount as u32);
    }
}
