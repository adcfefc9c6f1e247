//! Viewer data structures: models, textures, scene graphs, and instances.
//!
//! - `model` contains mesh and material definitions, GPU resources for 3D models
//! - `texture` contains the GPU texture wrapper and creation utilities
//! - `instance` holds node transforms and their GPU layout
//! - `scene_graph` turns a decoded asset into a node tree with GPU buffers
//! - `helpers` generates the grid and axes line geometry

pub mod helpers;
pub mod instance;
pub mod model;
pub mod scene_graph;
pub mod texture;
