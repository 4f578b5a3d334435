//! Selection and per-frame placement.
//!
//! The placement flow has two phases:
//!
//! 1. [`ActiveSession::start`] is awaited once per AR session. It acquires
//!    the `viewer` space, a hit-test source on it and the space hit poses are
//!    resolved in. If it fails or is dropped half-way, everything acquired so
//!    far is released again.
//! 2. [`ActiveSession::on_frame`] runs synchronously for every displayed
//!    frame and moves the selected asset onto the first surface hit.
//!
//! The scene, camera and selection live in a [`PlacementController`] that
//! is handed to the frame callback by reference.

use cgmath::Vector3;

use crate::{
    asset::{NormalizeError, prepare_placeable},
    camera::PerspectiveCamera,
    config::ArConfig,
    data_structures::scene_graph::{Light, Node, NodeId, NodeKind, Scene},
    render::SceneRenderer,
    xr::{ReferenceSpaceType, XrError, XrFrame, XrHitTestResult, XrSession},
};

/// Owns the scene and the user's selection.
pub struct PlacementController {
    scene: Scene,
    camera: PerspectiveCamera,
    item: NodeId,
    selected: Option<NodeId>,
}

impl PlacementController {
    /// `item` must be a node of `scene`.
    pub fn new(scene: Scene, camera: PerspectiveCamera, item: NodeId) -> Self {
        Self {
            scene,
            camera,
            item,
            selected: None,
        }
    }

    /// Builds the demo scene: a hemisphere light and the prepared `model`.
    pub fn from_model(
        config: &ArConfig,
        model: Node,
        width: u32,
        height: u32,
    ) -> Result<Self, NormalizeError> {
        let mut scene = Scene::new();
        scene.add(Node::new(
            "hemisphere_light",
            NodeKind::Light(Light::hemisphere(
                config.light.sky,
                config.light.ground,
                config.light.intensity,
            )),
        ));
        let item = prepare_placeable(model, config.target_height, config.opacity)?;
        let item = scene.add(item);
        let camera = PerspectiveCamera::new(&config.camera, width, height);
        Ok(Self::new(scene, camera, item))
    }

    /// Hides the placeable asset and makes `id` the selection.
    pub fn select(&mut self, id: NodeId) {
        if let Some(item) = self.scene.get_mut(self.item) {
            item.visible = false;
        }
        log::info!("Selected node {:?} for placement", id);
        self.selected = Some(id);
    }

    /// The placeable asset's handle.
    pub fn item(&self) -> NodeId {
        self.item
    }

    pub fn selected(&self) -> Option<NodeId> {
        self.selected
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut PerspectiveCamera {
        &mut self.camera
    }
}

/// What a single frame callback did.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FrameOutcome {
    /// No frame data; nothing was queried or drawn.
    Skipped,
    /// Nothing is selected; the scene was drawn as is.
    Idle,
    /// The selection was moved to the given position and shown.
    Placed(Vector3<f32>),
    /// No surface was hit; the selection was hidden.
    Hidden,
}

/// Releases a partially started session unless disarmed.
struct SessionGuard<S: XrSession> {
    session: Option<S>,
    hit_test_source: Option<S::HitTestSource>,
}

impl<S: XrSession> SessionGuard<S> {
    fn new(session: S) -> Self {
        Self {
            session: Some(session),
            hit_test_source: None,
        }
    }

    fn disarm(mut self) -> Option<(S, S::HitTestSource)> {
        let session = self.session.take()?;
        match self.hit_test_source.take() {
            Some(source) => Some((session, source)),
            None => {
                self.session = Some(session);
                None
            }
        }
    }
}

impl<S: XrSession> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        if let Some(session) = &mut self.session {
            log::warn!("Session start did not complete, releasing acquired resources");
            if let Some(source) = self.hit_test_source.take() {
                session.cancel_hit_test_source(&source);
            }
            session.end();
        }
    }
}

/// A session whose spaces and hit-test source are ready.
///
/// Dropping it cancels the hit-test source and ends the session.
pub struct ActiveSession<S: XrSession> {
    session: S,
    hit_test_source: S::HitTestSource,
    reference_space: S::ReferenceSpace,
}

impl<S: XrSession> ActiveSession<S> {
    /// Acquires everything the frame callback needs.
    ///
    /// `reference_space` is the space poses are resolved in, the hit-test
    /// source itself is always created on the `viewer` space.
    pub async fn start(session: S, reference_space: ReferenceSpaceType) -> Result<Self, XrError> {
        let mut guard = SessionGuard::new(session);
        let Some(session) = guard.session.as_mut() else {
            return Err(XrError::SessionEnded);
        };
        let viewer_space = session
            .request_reference_space(ReferenceSpaceType::Viewer)
            .await?;
        let source = session.request_hit_test_source(&viewer_space).await?;
        guard.hit_test_source = Some(source);
        let reference_space = session.request_reference_space(reference_space).await?;

        let (session, hit_test_source) = guard.disarm().ok_or(XrError::SessionEnded)?;
        log::info!("AR session ready, placing against hit-test results");
        Ok(Self {
            session,
            hit_test_source,
            reference_space,
        })
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    pub fn reference_space(&self) -> &S::ReferenceSpace {
        &self.reference_space
    }

    /// The per-frame callback.
    ///
    /// Without `frame` data nothing is queried and nothing is drawn.
    /// Otherwise the camera follows the viewer pose, the selected node is
    /// moved onto the first hit (or hidden when there is none) and the scene
    /// is rendered.
    pub fn on_frame<R>(
        &self,
        controller: &mut PlacementController,
        timestamp: f64,
        frame: Option<&S::Frame>,
        renderer: &mut R,
    ) -> anyhow::Result<FrameOutcome>
    where
        R: SceneRenderer + ?Sized,
    {
        let Some(frame) = frame else {
            return Ok(FrameOutcome::Skipped);
        };

        if let Some(viewer) = frame.viewer_pose(&self.reference_space) {
            controller.camera.pose = viewer.transform;
        }

        let outcome = match controller.selected {
            Some(selected) => {
                let pose = frame
                    .hit_test_results(&self.hit_test_source)
                    .first()
                    .and_then(|hit| hit.pose(&self.reference_space));
                match controller.scene.get_mut(selected) {
                    Some(node) => match pose {
                        Some(pose) => {
                            let position = pose.position();
                            node.visible = true;
                            node.transform.position = position;
                            log::trace!("t={:.1}ms placed at {:?}", timestamp, position);
                            FrameOutcome::Placed(position)
                        }
                        None => {
                            node.visible = false;
                            FrameOutcome::Hidden
                        }
                    },
                    None => {
                        log::warn!("Selected node {:?} is not part of the scene", selected);
                        FrameOutcome::Idle
                    }
                }
            }
            None => FrameOutcome::Idle,
        };

        renderer.render(&controller.scene, &controller.camera)?;
        Ok(outcome)
    }

    /// Cancels the hit-test source and ends the session.
    pub fn end(self) {
        drop(self);
    }
}

impl<S: XrSession> Drop for ActiveSession<S> {
    fn drop(&mut self) {
        self.session.cancel_hit_test_source(&self.hit_test_source);
        self.session.end();
    }
}
