//! Render pipelines of the scene renderer.
//!
//! - `basic` draws opaque meshes and owns the shared pipeline builder
//! - `transparent` draws alpha-blended meshes after the opaque ones
//! - `light` holds the hemisphere light uniform

pub mod basic;
pub mod light;
pub mod transparent;
