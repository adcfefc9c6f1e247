//! floor-viewer
//!
//! A cross-platform 3D building viewer. It renders a lit, shadowed scene
//! around one active floor model and swaps that model on demand through
//! floor buttons, either the hosting page's DOM buttons or an egui overlay.
//! The same sources build a native application and a WASM library.
//!
//! High-level modules
//! - `active_model`: the single model slot with generation-tracked loads
//! - `camera`: camera, projection, orbit controls and the camera uniform
//! - `config`: `ViewerConfig` with serde defaults, read from `viewer.json`
//! - `context`: central GPU and window context that owns device/queue/pipelines
//! - `data_structures`: meshes, materials, instances, textures and scene graph
//! - `flow`: event loop and frame driver
//! - `menu`: floor table, tower submenu and click dispatch
//! - `pick`: ray casting against scene triangles
//! - `pipelines`: lit, shadow, sky and line pipelines with their resources
//! - `resources`: asset fetching and glTF / HDR decoding
//! - `render`: render composition shared by the shadow and main passes
//! - `ui`: egui debug panel and fallback floor bar
//!

pub mod active_model;
pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
#[cfg(target_arch = "wasm32")]
mod dom;
pub mod flow;
pub mod menu;
pub mod pick;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod ui;

pub use flow::run;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    run().map_err(|e| JsValue::from_str(&format!("{e:#}")))
}
