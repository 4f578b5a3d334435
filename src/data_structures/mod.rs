//! Engine data structures: scene graph, meshes, materials and transforms.
//!
//! - `scene_graph` holds the node tree and the visitors walking it
//! - `mesh` contains CPU-side geometry and the vertex layout
//! - `material` describes surface colour, opacity and blending
//! - `instance` holds per-node transformation data
//! - `bounds` computes axis-aligned bounding boxes of subtrees
//! - `texture` wraps the GPU depth buffer

pub mod bounds;
pub mod instance;
pub mod material;
pub mod mesh;
pub mod scene_graph;
pub mod texture;
