//! AR platform abstraction.
//!
//! The placement loop talks to the device's AR runtime through three traits
//! modelled after the WebXR device API:
//!
//! - [`XrSystem`] negotiates a session given the features the app needs
//! - [`XrSession`] hands out reference spaces and hit-test sources
//! - [`XrFrame`] answers hit-test queries for one displayed frame
//!
//! [`emulated`] provides a desktop implementation whose "surfaces" are a
//! flat floor plane, which is what the native binary runs on.

pub mod emulated;

use cgmath::{Matrix4, Vector3};
use serde::Deserialize;
use thiserror::Error;

pub const FEATURE_HIT_TEST: &str = "hit-test";
pub const FEATURE_DOM_OVERLAY: &str = "dom-overlay";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum XrError {
    #[error("session mode {0:?} is not supported")]
    UnsupportedMode(SessionMode),
    #[error("required feature '{0}' is not supported")]
    MissingFeature(String),
    #[error("reference space '{}' is not available", .0.as_str())]
    ReferenceSpaceUnavailable(ReferenceSpaceType),
    #[error("hit-test source could not be created: {0}")]
    HitTestSource(String),
    #[error("the session has already ended")]
    SessionEnded,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionMode {
    Inline,
    ImmersiveVr,
    ImmersiveAr,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReferenceSpaceType {
    Viewer,
    Local,
    LocalFloor,
    BoundedFloor,
    Unbounded,
}

impl ReferenceSpaceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceSpaceType::Viewer => "viewer",
            ReferenceSpaceType::Local => "local",
            ReferenceSpaceType::LocalFloor => "local-floor",
            ReferenceSpaceType::BoundedFloor => "bounded-floor",
            ReferenceSpaceType::Unbounded => "unbounded",
        }
    }
}

/// What the app asks the platform for when requesting a session.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionInit {
    pub required_features: Vec<String>,
    pub optional_features: Vec<String>,
    /// Id of the element that stays interactive on top of the camera feed.
    pub dom_overlay_root: Option<String>,
}

/// A rigid transform reported by the platform, relative to some reference space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    pub transform: Matrix4<f32>,
}

impl Pose {
    pub fn from_matrix(transform: Matrix4<f32>) -> Self {
        Self { transform }
    }

    /// Builds a pose from 16 floats in column-major order, the layout
    /// platforms use for `XRRigidTransform.matrix`.
    pub fn from_column_major(m: &[f32; 16]) -> Self {
        Self {
            transform: Matrix4::new(
                m[0], m[1], m[2], m[3], m[4], m[5], m[6], m[7], m[8], m[9], m[10], m[11], m[12],
                m[13], m[14], m[15],
            ),
        }
    }

    /// Translation part of the transform.
    pub fn position(&self) -> Vector3<f32> {
        self.transform.w.truncate()
    }
}

/// Entry point of an AR runtime.
#[allow(async_fn_in_trait)]
pub trait XrSystem {
    type Session: XrSession;

    async fn is_session_supported(&self, mode: SessionMode) -> bool;

    async fn request_session(
        &self,
        mode: SessionMode,
        init: &SessionInit,
    ) -> Result<Self::Session, XrError>;
}

/// A running AR session.
///
/// `cancel_hit_test_source` and `end` must be safe to call more than once.
#[allow(async_fn_in_trait)]
pub trait XrSession {
    type ReferenceSpace;
    type HitTestSource;
    type Frame: XrFrame<ReferenceSpace = Self::ReferenceSpace, HitTestSource = Self::HitTestSource>;

    /// Features granted when the session was created.
    fn enabled_features(&self) -> &[String];

    async fn request_reference_space(
        &mut self,
        kind: ReferenceSpaceType,
    ) -> Result<Self::ReferenceSpace, XrError>;

    async fn request_hit_test_source(
        &mut self,
        space: &Self::ReferenceSpace,
    ) -> Result<Self::HitTestSource, XrError>;

    fn cancel_hit_test_source(&mut self, source: &Self::HitTestSource);

    fn end(&mut self);
}

/// The platform state belonging to one displayed frame.
pub trait XrFrame {
    type ReferenceSpace;
    type HitTestSource;
    type HitTestResult: XrHitTestResult<Self::ReferenceSpace>;

    /// Surface hits for `source`, nearest first.
    fn hit_test_results(&self, source: &Self::HitTestSource) -> Vec<Self::HitTestResult>;

    /// Where the device is, expressed in `space`.
    fn viewer_pose(&self, space: &Self::ReferenceSpace) -> Option<Pose>;
}

pub trait XrHitTestResult<Space> {
    /// The hit expressed in `space`, `None` if the space cannot be related to it right now.
    fn pose(&self, space: &Space) -> Option<Pose>;
}
