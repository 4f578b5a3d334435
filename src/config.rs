//! Application configuration.
//!
//! Every field has a default, so an empty TOML document (or no file at all)
//! yields the stock demo: the loadbee sample model, 1 m tall, half
//! transparent, placed through a `hit-test` capable AR session.

use std::path::Path;

use anyhow::{Context as _, Result};
use serde::Deserialize;

use crate::xr::{FEATURE_DOM_OVERLAY, FEATURE_HIT_TEST, ReferenceSpaceType, SessionInit};

pub const DEFAULT_MODEL_URL: &str =
    "https://mediacdn.loadbee.com/threeD/oddity/415X_Prep_CB_gltf.glb";

#[derive(Debug, Clone, Deserialize)]
pub struct ArConfig {
    /// `http(s)://` URL or a path below `assets/` of the binary glTF to place
    #[serde(default = "default_model_url")]
    pub model_url: String,
    /// Height in metres the model is scaled to
    #[serde(default = "default_target_height")]
    pub target_height: f32,
    /// Opacity applied to every surface of the placed model
    #[serde(default = "default_opacity")]
    pub opacity: f32,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub light: LightConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub emulation: EmulationConfig,
}

impl Default for ArConfig {
    fn default() -> Self {
        Self {
            model_url: default_model_url(),
            target_height: default_target_height(),
            opacity: default_opacity(),
            camera: CameraConfig::default(),
            light: LightConfig::default(),
            session: SessionConfig::default(),
            emulation: EmulationConfig::default(),
        }
    }
}

impl ArConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: ArConfig = toml::from_str(text).context("Invalid configuration")?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read config file {}", path.display()))?;
        let config = Self::from_toml_str(&text)?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }
}

fn default_model_url() -> String {
    DEFAULT_MODEL_URL.to_string()
}

fn default_target_height() -> f32 {
    1.0
}

fn default_opacity() -> f32 {
    0.5
}

#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
    #[serde(default = "default_fov_y")]
    pub fov_y_deg: f32,
    #[serde(default = "default_near")]
    pub near: f32,
    #[serde(default = "default_far")]
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_y_deg: default_fov_y(),
            near: default_near(),
            far: default_far(),
        }
    }
}

fn default_fov_y() -> f32 {
    70.0
}

fn default_near() -> f32 {
    0.01
}

fn default_far() -> f32 {
    20.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct LightConfig {
    /// 0xRRGGBB colour for surfaces facing up
    #[serde(default = "default_sky")]
    pub sky: u32,
    /// 0xRRGGBB colour for surfaces facing down
    #[serde(default = "default_ground")]
    pub ground: u32,
    #[serde(default = "default_intensity")]
    pub intensity: f32,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            sky: default_sky(),
            ground: default_ground(),
            intensity: default_intensity(),
        }
    }
}

fn default_sky() -> u32 {
    0xffffff
}

fn default_ground() -> u32 {
    0xbbbbff
}

fn default_intensity() -> f32 {
    1.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_required_features")]
    pub required_features: Vec<String>,
    #[serde(default = "default_optional_features")]
    pub optional_features: Vec<String>,
    #[serde(default = "default_dom_overlay_root")]
    pub dom_overlay_root: Option<String>,
    /// Space hit poses are resolved in
    #[serde(default = "default_reference_space")]
    pub reference_space: ReferenceSpaceType,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            required_features: default_required_features(),
            optional_features: default_optional_features(),
            dom_overlay_root: default_dom_overlay_root(),
            reference_space: default_reference_space(),
        }
    }
}

impl SessionConfig {
    pub fn to_session_init(&self) -> SessionInit {
        SessionInit {
            required_features: self.required_features.clone(),
            optional_features: self.optional_features.clone(),
            dom_overlay_root: self.dom_overlay_root.clone(),
        }
    }
}

fn default_required_features() -> Vec<String> {
    vec![FEATURE_HIT_TEST.to_string()]
}

fn default_optional_features() -> Vec<String> {
    vec![FEATURE_DOM_OVERLAY.to_string()]
}

fn default_dom_overlay_root() -> Option<String> {
    Some("body".to_string())
}

fn default_reference_space() -> ReferenceSpaceType {
    ReferenceSpaceType::LocalFloor
}

/// Settings of the desktop AR emulation.
#[derive(Debug, Clone, Deserialize)]
pub struct EmulationConfig {
    #[serde(default)]
    pub floor_height: f32,
    #[serde(default = "default_eye_height")]
    pub eye_height: f32,
    #[serde(default = "default_initial_pitch")]
    pub initial_pitch_deg: f32,
    /// Metres per second
    #[serde(default = "default_move_speed")]
    pub move_speed: f32,
    /// Radians per pixel of mouse motion
    #[serde(default = "default_look_sensitivity")]
    pub look_sensitivity: f32,
    #[serde(default = "default_max_hit_distance")]
    pub max_hit_distance: f32,
}

impl Default for EmulationConfig {
    fn default() -> Self {
        Self {
            floor_height: 0.0,
            eye_height: default_eye_height(),
            initial_pitch_deg: default_initial_pitch(),
            move_speed: default_move_speed(),
            look_sensitivity: default_look_sensitivity(),
            max_hit_distance: default_max_hit_distance(),
        }
    }
}

fn default_eye_height() -> f32 {
    1.6
}

fn default_initial_pitch() -> f32 {
    -30.0
}

fn default_move_speed() -> f32 {
    1.5
}

fn default_look_sensitivity() -> f32 {
    0.003
}

fn default_max_hit_distance() -> f32 {
    10.0
}
