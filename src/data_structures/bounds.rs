use cgmath::Vector3;

use crate::data_structures::{
    instance::Instance,
    mesh::Mesh,
    scene_graph::{Node, NodeVisitor},
};

/// Axis-aligned bounding box in world space.
///
/// A freshly created box is empty (`min > max`) and stays empty until a
/// point is added.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,
}

impl Aabb {
    pub fn empty() -> Self {
        Self {
            min: Vector3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
            max: Vector3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.max.x < self.min.x || self.max.y < self.min.y || self.max.z < self.min.z
    }

    pub fn expand_by_point(&mut self, p: Vector3<f32>) {
        self.min = Vector3::new(self.min.x.min(p.x), self.min.y.min(p.y), self.min.z.min(p.z));
        self.max = Vector3::new(self.max.x.max(p.x), self.max.y.max(p.y), self.max.z.max(p.z));
    }

    /// Extent along each axis; zero for an empty box.
    pub fn size(&self) -> Vector3<f32> {
        if self.is_empty() {
            return Vector3::new(0.0, 0.0, 0.0);
        }
        self.max - self.min
    }

    /// Midpoint of the box; the origin for an empty box.
    pub fn center(&self) -> Vector3<f32> {
        if self.is_empty() {
            return Vector3::new(0.0, 0.0, 0.0);
        }
        (self.min + self.max) * 0.5
    }

    /// Tight bounds of every mesh vertex in the subtree of `node`.
    ///
    /// The node's own transform is applied, visibility is ignored.
    pub fn from_node(node: &Node) -> Aabb {
        let mut visitor = BoundsVisitor(Aabb::empty());
        node.accept(&mut visitor, &Instance::default());
        visitor.0
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}

struct BoundsVisitor(Aabb);

impl NodeVisitor for BoundsVisitor {
    fn visit_mesh(&mut self, _: &Node, mesh: &Mesh, world: &Instance) {
        let matrix = world.to_matrix();
        for vertex in &mesh.vertices {
            let local: Vector3<f32> = vertex.position.into();
            self.0.expand_by_point((matrix * local.extend(1.0)).truncate());
        }
    }
}
