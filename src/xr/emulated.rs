//! Desktop emulation of an AR runtime.
//!
//! The "device" is a free-look viewer rig steered with the keyboard and mouse.
//! The only real-world surface is an infinite horizontal floor at
//! `floor_height`; hit tests cast a ray along the -Z axis of the hit-test
//! source's space and report where it meets that floor.
//!
//! Emulated world coordinates double as the `local-floor` space (shifted by
//! the floor height). `local` sits `eye_height` above the floor origin and
//! `viewer` follows the rig.

use std::time::Duration;

use cgmath::{InnerSpace, Matrix4, Rad, SquareMatrix, Vector3, Vector4};
use winit::keyboard::KeyCode;

use crate::{
    config::EmulationConfig,
    xr::{
        FEATURE_DOM_OVERLAY, FEATURE_HIT_TEST, Pose, ReferenceSpaceType, SessionInit,
        SessionMode, XrError, XrFrame, XrHitTestResult, XrSession, XrSystem,
    },
};

#[derive(Clone, Debug)]
pub struct EmulatedXr {
    settings: EmulationConfig,
    supported_features: Vec<String>,
}

impl EmulatedXr {
    pub fn new(settings: EmulationConfig) -> Self {
        Self {
            settings,
            supported_features: vec![FEATURE_HIT_TEST.to_string(), FEATURE_DOM_OVERLAY.to_string()],
        }
    }

    /// Restricts the features this runtime claims to support.
    pub fn with_supported_features(mut self, features: &[&str]) -> Self {
        self.supported_features = features.iter().map(|f| f.to_string()).collect();
        self
    }
}

impl XrSystem for EmulatedXr {
    type Session = EmulatedSession;

    async fn is_session_supported(&self, mode: SessionMode) -> bool {
        matches!(mode, SessionMode::ImmersiveAr | SessionMode::Inline)
    }

    async fn request_session(
        &self,
        mode: SessionMode,
        init: &SessionInit,
    ) -> Result<EmulatedSession, XrError> {
        if !self.is_session_supported(mode).await {
            return Err(XrError::UnsupportedMode(mode));
        }
        if let Some(missing) = init
            .required_features
            .iter()
            .find(|f| !self.supported_features.contains(f))
        {
            return Err(XrError::MissingFeature(missing.clone()));
        }
        let mut enabled = init.required_features.clone();
        for feature in &init.optional_features {
            if self.supported_features.contains(feature) && !enabled.contains(feature) {
                enabled.push(feature.clone());
            } else if !self.supported_features.contains(feature) {
                log::info!("Optional feature '{}' is not available and was skipped", feature);
            }
        }
        if let Some(root) = &init.dom_overlay_root {
            log::debug!("DOM overlay root '{}' has no effect in the emulated runtime", root);
        }
        log::info!("Emulated {:?} session started with features {:?}", mode, enabled);
        Ok(EmulatedSession::new(self.settings.clone(), enabled))
    }
}

/// Free-look camera standing in for the physical device.
#[derive(Clone, Debug)]
pub struct ViewerRig {
    pub position: Vector3<f32>,
    /// Rotation around +Y in radians, zero looks down -Z.
    pub yaw: f32,
    /// Rotation around the rig's X axis in radians, negative looks down.
    pub pitch: f32,
    speed: f32,
    sensitivity: f32,
    forward: f32,
    right: f32,
    up: f32,
}

impl ViewerRig {
    pub fn new(settings: &EmulationConfig) -> Self {
        Self {
            position: Vector3::new(0.0, settings.floor_height + settings.eye_height, 0.0),
            yaw: 0.0,
            pitch: settings.initial_pitch_deg.to_radians(),
            speed: settings.move_speed,
            sensitivity: settings.look_sensitivity,
            forward: 0.0,
            right: 0.0,
            up: 0.0,
        }
    }

    pub fn pose(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.position)
            * Matrix4::from_angle_y(Rad(self.yaw))
            * Matrix4::from_angle_x(Rad(self.pitch))
    }

    /// Returns whether the key moves the rig.
    pub fn process_key(&mut self, key: KeyCode, pressed: bool) -> bool {
        let amount = if pressed { 1.0 } else { 0.0 };
        match key {
            KeyCode::KeyW | KeyCode::ArrowUp => self.forward = amount,
            KeyCode::KeyS | KeyCode::ArrowDown => self.forward = -amount,
            KeyCode::KeyD | KeyCode::ArrowRight => self.right = amount,
            KeyCode::KeyA | KeyCode::ArrowLeft => self.right = -amount,
            KeyCode::KeyE | KeyCode::Space => self.up = amount,
            KeyCode::KeyQ | KeyCode::ShiftLeft => self.up = -amount,
            _ => return false,
        }
        true
    }

    pub fn rotate(&mut self, dx: f64, dy: f64) {
        let limit = 89.0_f32.to_radians();
        self.yaw -= dx as f32 * self.sensitivity;
        self.pitch = (self.pitch - dy as f32 * self.sensitivity).clamp(-limit, limit);
    }

    pub fn update(&mut self, dt: Duration) {
        let dt = dt.as_secs_f32();
        let (sin, cos) = self.yaw.sin_cos();
        let forward = Vector3::new(-sin, 0.0, -cos);
        let right = Vector3::new(cos, 0.0, -sin);
        self.position += (forward * self.forward + right * self.right) * self.speed * dt;
        self.position.y += self.up * self.speed * dt;
    }
}

/// Where each reference space sits in emulated world coordinates for one frame.
#[derive(Clone, Copy, Debug)]
struct SpaceOrigins {
    viewer: Matrix4<f32>,
    floor_height: f32,
    eye_height: f32,
}

impl SpaceOrigins {
    fn origin(&self, kind: ReferenceSpaceType) -> Matrix4<f32> {
        match kind {
            ReferenceSpaceType::Viewer => self.viewer,
            ReferenceSpaceType::Local => Matrix4::from_translation(Vector3::new(
                0.0,
                self.floor_height + self.eye_height,
                0.0,
            )),
            ReferenceSpaceType::LocalFloor
            | ReferenceSpaceType::BoundedFloor
            | ReferenceSpaceType::Unbounded => {
                Matrix4::from_translation(Vector3::new(0.0, self.floor_height, 0.0))
            }
        }
    }

    fn relative(&self, world: Matrix4<f32>, space: &EmulatedSpace) -> Option<Pose> {
        self.origin(space.kind)
            .invert()
            .map(|inverse| Pose::from_matrix(inverse * world))
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EmulatedSpace {
    pub kind: ReferenceSpaceType,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EmulatedHitTestSource {
    id: u32,
    space: EmulatedSpace,
}

pub struct EmulatedSession {
    settings: EmulationConfig,
    enabled_features: Vec<String>,
    viewer: ViewerRig,
    next_source_id: u32,
    active_sources: Vec<u32>,
    ended: bool,
}

impl EmulatedSession {
    fn new(settings: EmulationConfig, enabled_features: Vec<String>) -> Self {
        let viewer = ViewerRig::new(&settings);
        Self {
            settings,
            enabled_features,
            viewer,
            next_source_id: 0,
            active_sources: Vec::new(),
            ended: false,
        }
    }

    pub fn viewer(&self) -> &ViewerRig {
        &self.viewer
    }

    pub fn viewer_mut(&mut self) -> &mut ViewerRig {
        &mut self.viewer
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn active_hit_test_sources(&self) -> usize {
        self.active_sources.len()
    }

    /// Snapshot of the platform state for the frame about to be drawn.
    ///
    /// `None` once the session has ended.
    pub fn frame(&self) -> Option<EmulatedFrame> {
        if self.ended {
            return None;
        }
        Some(EmulatedFrame {
            origins: SpaceOrigins {
                viewer: self.viewer.pose(),
                floor_height: self.settings.floor_height,
                eye_height: self.settings.eye_height,
            },
            max_hit_distance: self.settings.max_hit_distance,
            active_sources: self.active_sources.clone(),
        })
    }
}

impl XrSession for EmulatedSession {
    type ReferenceSpace = EmulatedSpace;
    type HitTestSource = EmulatedHitTestSource;
    type Frame = EmulatedFrame;

    fn enabled_features(&self) -> &[String] {
        &self.enabled_features
    }

    async fn request_reference_space(
        &mut self,
        kind: ReferenceSpaceType,
    ) -> Result<EmulatedSpace, XrError> {
        if self.ended {
            return Err(XrError::SessionEnded);
        }
        match kind {
            ReferenceSpaceType::BoundedFloor | ReferenceSpaceType::Unbounded => {
                Err(XrError::ReferenceSpaceUnavailable(kind))
            }
            _ => Ok(EmulatedSpace { kind }),
        }
    }

    async fn request_hit_test_source(
        &mut self,
        space: &EmulatedSpace,
    ) -> Result<EmulatedHitTestSource, XrError> {
        if self.ended {
            return Err(XrError::SessionEnded);
        }
        if !self.enabled_features.iter().any(|f| f == FEATURE_HIT_TEST) {
            return Err(XrError::HitTestSource(format!(
                "feature '{}' was not enabled for this session",
                FEATURE_HIT_TEST
            )));
        }
        let id = self.next_source_id;
        self.next_source_id += 1;
        self.active_sources.push(id);
        Ok(EmulatedHitTestSource { id, space: *space })
    }

    fn cancel_hit_test_source(&mut self, source: &EmulatedHitTestSource) {
        self.active_sources.retain(|id| *id != source.id);
    }

    fn end(&mut self) {
        if !self.ended {
            log::info!("Emulated session ended");
        }
        self.ended = true;
        self.active_sources.clear();
    }
}

pub struct EmulatedFrame {
    origins: SpaceOrigins,
    max_hit_distance: f32,
    active_sources: Vec<u32>,
}

impl XrFrame for EmulatedFrame {
    type ReferenceSpace = EmulatedSpace;
    type HitTestSource = EmulatedHitTestSource;
    type HitTestResult = EmulatedHitTestResult;

    fn hit_test_results(&self, source: &EmulatedHitTestSource) -> Vec<EmulatedHitTestResult> {
        if !self.active_sources.contains(&source.id) {
            return Vec::new();
        }
        let ray = self.origins.origin(source.space.kind);
        let origin = ray.w.truncate();
        let direction = (ray * Vector4::new(0.0, 0.0, -1.0, 0.0)).truncate();
        if direction.magnitude2() <= f32::EPSILON {
            return Vec::new();
        }
        let direction = direction.normalize();
        if direction.y.abs() <= f32::EPSILON {
            return Vec::new();
        }
        let t = (self.origins.floor_height - origin.y) / direction.y;
        if t <= 0.0 || t > self.max_hit_distance {
            return Vec::new();
        }
        let point = origin + direction * t;
        vec![EmulatedHitTestResult {
            world: Matrix4::from_translation(point),
            origins: self.origins,
        }]
    }

    fn viewer_pose(&self, space: &EmulatedSpace) -> Option<Pose> {
        self.origins.relative(self.origins.viewer, space)
    }
}

pub struct EmulatedHitTestResult {
    world: Matrix4<f32>,
    origins: SpaceOrigins,
}

impl XrHitTestResult<EmulatedSpace> for EmulatedHitTestResult {
    fn pose(&self, space: &EmulatedSpace) -> Option<Pose> {
        self.origins.relative(self.world, space)
    }
}
