//! Scene graph and hierarchical scene organization.
//!
//! A [`Scene`] owns a list of top-level [`Node`]s, each addressed by a
//! [`NodeId`]. Nodes form a tree; the payload of a node is one of the
//! [`NodeKind`] variants. Code that needs to look at every node (bounds,
//! opacity, rendering) implements [`NodeVisitor`] or [`NodeVisitorMut`]
//! instead of matching on the tree by hand.

use crate::data_structures::{instance::Instance, mesh::Mesh};

/// A hemisphere light: `sky` lights surfaces facing up, `ground` those facing down.
#[derive(Clone, Debug, PartialEq)]
pub enum Light {
    Hemisphere {
        sky: [f32; 3],
        ground: [f32; 3],
        intensity: f32,
    },
}

impl Light {
    pub fn hemisphere(sky: u32, ground: u32, intensity: f32) -> Self {
        Light::Hemisphere {
            sky: hex_to_rgb(sky),
            ground: hex_to_rgb(ground),
            intensity,
        }
    }
}

pub(crate) fn hex_to_rgb(hex: u32) -> [f32; 3] {
    let r = ((hex >> 16) & 0xff) as f32 / 255.0;
    let g = ((hex >> 8) & 0xff) as f32 / 255.0;
    let b = (hex & 0xff) as f32 / 255.0;
    [r, g, b]
}

/// Camera parameters embedded in a model file. Not used for rendering.
#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    pub yfov: f32,
    pub znear: f32,
    pub zfar: Option<f32>,
}

#[derive(Clone, Debug)]
pub enum NodeKind {
    Mesh(Mesh),
    Group,
    Light(Light),
    Camera(Camera),
}

#[derive(Clone, Debug)]
pub struct Node {
    pub name: String,
    pub transform: Instance,
    pub visible: bool,
    pub kind: NodeKind,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(name: &str, kind: NodeKind) -> Self {
        Self {
            name: name.to_string(),
            transform: Instance::default(),
            visible: true,
            kind,
            children: Vec::new(),
        }
    }

    pub fn group(name: &str) -> Self {
        Self::new(name, NodeKind::Group)
    }

    pub fn mesh(mesh: Mesh) -> Self {
        let name = mesh.name.clone();
        Self::new(&name, NodeKind::Mesh(mesh))
    }

    pub fn add_child(&mut self, child: Node) {
        self.children.push(child);
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.add_child(child);
        self
    }

    /// Walks the subtree depth-first, handing each node its world transform.
    ///
    /// `parent` is the world transform of the node this one is attached to.
    pub fn accept(&self, visitor: &mut dyn NodeVisitor, parent: &Instance) {
        if !visitor.enter(self) {
            return;
        }
        let world = parent * &self.transform;
        match &self.kind {
            NodeKind::Mesh(mesh) => visitor.visit_mesh(self, mesh, &world),
            NodeKind::Group => visitor.visit_group(self, &world),
            NodeKind::Light(light) => visitor.visit_light(self, light, &world),
            NodeKind::Camera(camera) => visitor.visit_camera(self, camera, &world),
        }
        for child in &self.children {
            child.accept(visitor, &world);
        }
    }

    pub fn accept_mut(&mut self, visitor: &mut dyn NodeVisitorMut) {
        match &mut self.kind {
            NodeKind::Mesh(mesh) => visitor.visit_mesh(mesh),
            NodeKind::Group => visitor.visit_group(),
            NodeKind::Light(light) => visitor.visit_light(light),
            NodeKind::Camera(camera) => visitor.visit_camera(camera),
        }
        for child in &mut self.children {
            child.accept_mut(visitor);
        }
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Node::node_count).sum::<usize>()
    }
}

/// Read-only visitor. All methods default to doing nothing.
pub trait NodeVisitor {
    /// Called before a node is visited. Returning `false` skips the node and its subtree.
    fn enter(&mut self, _node: &Node) -> bool {
        true
    }

    fn visit_mesh(&mut self, _node: &Node, _mesh: &Mesh, _world: &Instance) {}

    fn visit_group(&mut self, _node: &Node, _world: &Instance) {}

    fn visit_light(&mut self, _node: &Node, _light: &Light, _world: &Instance) {}

    fn visit_camera(&mut self, _node: &Node, _camera: &Camera, _world: &Instance) {}
}

pub trait NodeVisitorMut {
    fn visit_mesh(&mut self, _mesh: &mut Mesh) {}

    fn visit_group(&mut self) {}

    fn visit_light(&mut self, _light: &mut Light) {}

    fn visit_camera(&mut self, _camera: &mut Camera) {}
}

/// Handle to a top-level node of a [`Scene`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Default)]
pub struct Scene {
    nodes: Vec<Node>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn accept(&self, visitor: &mut dyn NodeVisitor) {
        let root = Instance::default();
        for node in &self.nodes {
            node.accept(visitor, &root);
        }
    }

    /// First light found in the scene, if any.
    pub fn light(&self) -> Option<&Light> {
        fn find(node: &Node) -> Option<&Light> {
            match &node.kind {
                NodeKind::Light(light) => Some(light),
                _ => node.children.iter().find_map(find),
            }
        }
        self.nodes.iter().find_map(find)
    }
}
