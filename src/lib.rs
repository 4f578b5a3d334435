//! flow-ar
//!
//! Places a single glTF model in the world through an AR session. The model
//! is scaled to a target height, centred, made half transparent and hidden
//! until the user selects it. From then on every frame moves it onto the
//! surface the AR runtime's hit test reports, or hides it when there is none.
//!
//! High-level modules
//! - `asset`: model normalization and opacity
//! - `camera`: perspective camera driven by the viewer pose
//! - `config`: TOML configuration with defaults for every setting
//! - `context`: window, surface, device and queue
//! - `data_structures`: scene graph, meshes, materials, bounds and instances
//! - `flow`: the winit event loop and UI commands
//! - `pipelines`: wgpu render pipelines (opaque and blended)
//! - `placement`: selection state, session start and the per-frame callback
//! - `render`: the `SceneRenderer` seam and its wgpu implementation
//! - `resources`: fetching and parsing glTF models
//! - `xr`: AR runtime abstraction and a desktop emulation of it
//!

pub mod asset;
pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod flow;
pub mod pipelines;
pub mod placement;
pub mod render;
pub mod resources;
pub mod xr;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Browser entry point. Runs with the default configuration.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn run_web() -> Result<(), JsValue> {
    flow::run(config::ArConfig::default()).map_err(|e| JsValue::from_str(&e.to_string()))
}
