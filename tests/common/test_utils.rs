use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use cgmath::{Matrix4, Vector3};
use flow_ar::{
    camera::PerspectiveCamera,
    data_structures::{
        material::Material,
        mesh::{Mesh, ModelVertex},
        scene_graph::{Node, NodeId, Scene},
    },
    render::SceneRenderer,
    xr::{
        Pose, ReferenceSpaceType, XrError, XrFrame, XrHitTestResult, XrSession,
    },
};

/// Everything a [`MockSession`] was asked to do, shared with the test after
/// the session itself has been moved away.
#[derive(Debug, Default)]
pub struct Calls {
    pub reference_spaces: Vec<ReferenceSpaceType>,
    pub sources_requested: u32,
    pub sources_cancelled: u32,
    pub ended: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MockSpace(pub ReferenceSpaceType);

#[derive(Debug, Clone, PartialEq)]
pub struct MockSource(pub u32);

/// Scriptable AR session.
pub struct MockSession {
    pub calls: Rc<RefCell<Calls>>,
    /// Requesting this space fails
    pub fail_space: Option<ReferenceSpaceType>,
    /// Requesting this space never completes
    pub hang_on_space: Option<ReferenceSpaceType>,
    pub fail_hit_test_source: bool,
    features: Vec<String>,
}

impl MockSession {
    pub fn new() -> Self {
        Self {
            calls: Rc::new(RefCell::new(Calls::default())),
            fail_space: None,
            hang_on_space: None,
            fail_hit_test_source: false,
            features: vec!["hit-test".to_string()],
        }
    }

    pub fn calls(&self) -> Rc<RefCell<Calls>> {
        self.calls.clone()
    }
}

impl Default for MockSession {
    fn default() -> Self {
        Self::new()
    }
}

impl XrSession for MockSession {
    type ReferenceSpace = MockSpace;
    type HitTestSource = MockSource;
    type Frame = MockFrame;

    fn enabled_features(&self) -> &[String] {
        &self.features
    }

    async fn request_reference_space(
        &mut self,
        kind: ReferenceSpaceType,
    ) -> Result<MockSpace, XrError> {
        self.calls.borrow_mut().reference_spaces.push(kind);
        if self.hang_on_space == Some(kind) {
            std::future::pending::<()>().await;
        }
        if self.fail_space == Some(kind) {
            return Err(XrError::ReferenceSpaceUnavailable(kind));
        }
        Ok(MockSpace(kind))
    }

    async fn request_hit_test_source(&mut self, _space: &MockSpace) -> Result<MockSource, XrError> {
        if self.fail_hit_test_source {
            return Err(XrError::HitTestSource("scripted failure".to_string()));
        }
        let mut calls = self.calls.borrow_mut();
        calls.sources_requested += 1;
        Ok(MockSource(calls.sources_requested))
    }

    fn cancel_hit_test_source(&mut self, _source: &MockSource) {
        self.calls.borrow_mut().sources_cancelled += 1;
    }

    fn end(&mut self) {
        self.calls.borrow_mut().ended += 1;
    }
}

/// A frame with scripted hits and viewer pose.
pub struct MockFrame {
    pub hits: Vec<Pose>,
    pub viewer: Option<Pose>,
    pub queries: Cell<u32>,
}

impl MockFrame {
    pub fn with_hit(position: Vector3<f32>) -> Self {
        Self {
            hits: vec![Pose::from_matrix(Matrix4::from_translation(position))],
            viewer: None,
            queries: Cell::new(0),
        }
    }

    pub fn without_hits() -> Self {
        Self {
            hits: Vec::new(),
            viewer: None,
            queries: Cell::new(0),
        }
    }
}

pub struct MockHit(Pose);

impl XrHitTestResult<MockSpace> for MockHit {
    fn pose(&self, _space: &MockSpace) -> Option<Pose> {
        Some(self.0)
    }
}

impl XrFrame for MockFrame {
    type ReferenceSpace = MockSpace;
    type HitTestSource = MockSource;
    type HitTestResult = MockHit;

    fn hit_test_results(&self, _source: &MockSource) -> Vec<MockHit> {
        self.queries.set(self.queries.get() + 1);
        self.hits.iter().copied().map(MockHit).collect()
    }

    fn viewer_pose(&self, _space: &MockSpace) -> Option<Pose> {
        self.viewer
    }
}

/// Remembers what it was asked to draw instead of drawing it.
#[derive(Default)]
pub struct RecordingRenderer {
    pub renders: u32,
    pub camera_pose: Option<Matrix4<f32>>,
    /// Visibility of the watched node at the time of each render
    pub watched_visible: Vec<bool>,
    pub watch: Option<NodeId>,
}

impl RecordingRenderer {
    pub fn watching(id: NodeId) -> Self {
        Self {
            watch: Some(id),
            ..Default::default()
        }
    }
}

impl SceneRenderer for RecordingRenderer {
    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> anyhow::Result<()> {
        self.renders += 1;
        self.camera_pose = Some(camera.pose);
        if let Some(node) = self.watch.and_then(|id| scene.get(id)) {
            self.watched_visible.push(node.visible);
        }
        Ok(())
    }
}

/// Axis aligned box between `min` and `max` as a single mesh node.
pub fn box_node(name: &str, min: [f32; 3], max: [f32; 3]) -> Node {
    let corners: Vec<ModelVertex> = (0..8)
        .map(|i| ModelVertex {
            position: [
                if i & 1 == 0 { min[0] } else { max[0] },
                if i & 2 == 0 { min[1] } else { max[1] },
                if i & 4 == 0 { min[2] } else { max[2] },
            ],
            normal: [0.0, 1.0, 0.0],
        })
        .collect();
    #[rustfmt::skip]
    let indices = vec![
        0, 2, 1, 1, 2, 3, // -z
        4, 5, 6, 5, 7, 6, // +z
        0, 1, 4, 1, 5, 4, // -y
        2, 6, 3, 3, 6, 7, // +y
        0, 4, 2, 2, 4, 6, // -x
        1, 3, 5, 3, 7, 5, // +x
    ];
    let mut mesh = Mesh::new(name, corners, indices, Material::new("box", [0.8, 0.2, 0.2, 1.0]));
    mesh.compute_normals();
    Node::mesh(mesh)
}

/// A model with two boxes below a group, one of them moved and scaled.
pub fn two_box_model() -> Node {
    let mut moved = box_node("moved", [0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);
    moved.transform.position = Vector3::new(2.0, 1.0, 0.0);
    moved.transform.scale = Vector3::new(2.0, 2.0, 2.0);
    Node::group("model")
        .with_child(box_node("base", [-1.0, 0.0, -1.0], [1.0, 1.0, 1.0]))
        .with_child(moved)
}

pub fn assert_near(actual: Vector3<f32>, expected: Vector3<f32>) {
    let eps = 1e-4;
    assert!(
        (actual.x - expected.x).abs() < eps
            && (actual.y - expected.y).abs() < eps
            && (actual.z - expected.z).abs() < eps,
        "expected {:?}, got {:?}",
        expected,
        actual
    );
}
