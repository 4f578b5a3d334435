//! Preparing a loaded model for placement.
//!
//! A freshly decoded model has arbitrary units and an arbitrary pivot. Before
//! it can be dropped onto a hit-tested surface it is rescaled to a known
//! height, recentered on its bounding box and wrapped into a container node
//! that the placement loop moves around.

use thiserror::Error;

use crate::data_structures::{
    bounds::Aabb,
    mesh::Mesh,
    scene_graph::{Node, NodeVisitorMut},
};

#[derive(Error, Debug, PartialEq)]
pub enum NormalizeError {
    #[error("target height must be finite and positive, got {0}")]
    InvalidTargetHeight(f32),
    #[error("model has no geometry to measure")]
    EmptyGeometry,
    #[error("model has a degenerate vertical extent of {0}")]
    DegenerateHeight(f32),
}

/// Scales `node` uniformly so its bounding box is `height` tall, then moves
/// it so the bounding box is centered on the origin.
///
/// On error the node is left untouched.
pub fn normalize_model(node: &mut Node, height: f32) -> Result<(), NormalizeError> {
    if !height.is_finite() || height <= 0.0 {
        return Err(NormalizeError::InvalidTargetHeight(height));
    }
    let bounds = Aabb::from_node(node);
    if bounds.is_empty() {
        return Err(NormalizeError::EmptyGeometry);
    }
    let size = bounds.size();
    if !size.y.is_finite() || size.y <= f32::EPSILON {
        return Err(NormalizeError::DegenerateHeight(size.y));
    }

    node.transform.scale *= height / size.y;

    let center = Aabb::from_node(node).center();
    node.transform.position -= center;
    Ok(())
}

struct OpacityVisitor(f32);

impl NodeVisitorMut for OpacityVisitor {
    fn visit_mesh(&mut self, mesh: &mut Mesh) {
        mesh.material.set_opacity(self.0);
    }
}

/// Applies `opacity` to the material of every mesh below `node`.
pub fn set_opacity(node: &mut Node, opacity: f32) {
    node.accept_mut(&mut OpacityVisitor(opacity));
}

/// Normalizes `model`, wraps it into a hidden container and applies `opacity`.
///
/// The container starts at the origin so its position can later be set to a
/// hit pose without disturbing the model's centering offset.
pub fn prepare_placeable(mut model: Node, height: f32, opacity: f32) -> Result<Node, NormalizeError> {
    normalize_model(&mut model, height)?;
    let mut item = Node::group("placeable").with_child(model);
    item.visible = false;
    set_opacity(&mut item, opacity);
    Ok(item)
}
