//! Game settings and tuning
//!
//! Every gameplay constant can be overridden from a JSON file. Missing
//! sections and fields fall back to the values in [`crate::consts`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Avatar motion and collision response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsTuning {
    pub avatar_radius: f32,
    /// Units/frame² added to vy once per frame
    pub gravity: f32,
    /// Multiplier applied to vx once per frame
    pub friction: f32,
    pub substeps: u32,
    pub max_speed: f32,
    pub force_multiplier: f32,
    pub force_cap: f32,
    pub vibrate_ms_per_force: f32,
    /// Speed multiplier on bouncy contact (> 1)
    pub bounce_gain: f32,
    /// Distance pushed along the normal after a bounce
    pub bounce_nudge: f32,
    /// Speed kept when reflecting off a side boundary (< 1)
    pub boundary_restitution: f32,
}

impl Default for PhysicsTuning {
    fn default() -> Self {
        Self {
            avatar_radius: AVATAR_RADIUS,
            gravity: GRAVITY,
            friction: AIR_FRICTION,
            substeps: COLLISION_SUBSTEPS,
            max_speed: MAX_SPEED,
            force_multiplier: FORCE_MULTIPLIER,
            force_cap: FORCE_CAP,
            vibrate_ms_per_force: VIBRATE_MS_PER_FORCE,
            bounce_gain: BOUNCE_GAIN,
            bounce_nudge: BOUNCE_NUDGE,
            boundary_restitution: BOUNDARY_RESTITUTION,
        }
    }
}

/// Level generation and world bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldTuning {
    pub width: f32,
    pub viewport_height: f32,
    pub floor_y: f32,
    pub floor_height: f32,
    pub gap_min: f32,
    pub gap_max: f32,
    pub initial_platforms: u32,
    pub platform_thickness: f32,
    pub platform_width_min: f32,
    pub platform_width_max: f32,
    pub vertical_width: f32,
    pub vertical_height_min: f32,
    pub vertical_height_max: f32,
    pub weight_normal: u32,
    pub weight_bouncy: u32,
    pub weight_vertical: u32,
    pub lookahead: f32,
    pub prune_margin: f32,
    pub death_margin: f32,
}

impl Default for WorldTuning {
    fn default() -> Self {
        Self {
            width: WORLD_WIDTH,
            viewport_height: VIEWPORT_HEIGHT,
            floor_y: FLOOR_Y,
            floor_height: FLOOR_HEIGHT,
            gap_min: GAP_MIN,
            gap_max: GAP_MAX,
            initial_platforms: INITIAL_PLATFORMS,
            platform_thickness: PLATFORM_THICKNESS,
            platform_width_min: PLATFORM_WIDTH_MIN,
            platform_width_max: PLATFORM_WIDTH_MAX,
            vertical_width: VERTICAL_WIDTH,
            vertical_height_min: VERTICAL_HEIGHT_MIN,
            vertical_height_max: VERTICAL_HEIGHT_MAX,
            weight_normal: WEIGHT_NORMAL,
            weight_bouncy: WEIGHT_BOUNCY,
            weight_vertical: WEIGHT_VERTICAL,
            lookahead: LOOKAHEAD,
            prune_margin: PRUNE_MARGIN,
            death_margin: DEATH_MARGIN,
        }
    }
}

/// Camera follow behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraTuning {
    /// Approximate time (seconds) to reach the target
    pub smooth_time: f32,
    /// Fraction of the viewport kept above the avatar
    pub anchor: f32,
}

impl Default for CameraTuning {
    fn default() -> Self {
        Self {
            smooth_time: CAMERA_SMOOTH_TIME,
            anchor: CAMERA_ANCHOR,
        }
    }
}

/// Controller-side tilt mapping
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputTuning {
    pub sensitivity: f32,
    pub max_magnitude: f32,
}

impl Default for InputTuning {
    fn default() -> Self {
        Self {
            sensitivity: TILT_SENSITIVITY,
            max_magnitude: TILT_MAX_MAGNITUDE,
        }
    }
}

/// Score derivation and reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreTuning {
    pub units_per_meter: f32,
    /// A score message is sent each time the best height crosses a multiple of this
    pub report_step: u32,
}

impl Default for ScoreTuning {
    fn default() -> Self {
        Self {
            units_per_meter: UNITS_PER_METER,
            report_step: SCORE_REPORT_STEP,
        }
    }
}

/// Peer transport options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    pub bind: String,
    pub connect_timeout_ms: u64,
    /// Base URL the join link is built on
    pub link_base: String,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:7777".to_string(),
            connect_timeout_ms: 5000,
            link_base: "http://localhost:8080/".to_string(),
        }
    }
}

/// All tuning for one process (host or controller)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub physics: PhysicsTuning,
    pub world: WorldTuning,
    pub camera: CameraTuning,
    pub input: InputTuning,
    pub score: ScoreTuning,
    pub network: NetworkSettings,
}

impl Settings {
    /// Load settings from a JSON file and validate them
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SettingsError::Io(path.to_path_buf(), e))?;
        let settings: Settings = serde_json::from_str(&content)
            .map_err(|e| SettingsError::Parse(path.to_path_buf(), e))?;
        settings.validate()?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Load from `path` if given, otherwise use defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, SettingsError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                log::info!("Using default settings");
                Ok(Self::default())
            }
        }
    }

    /// Reject tunings the simulation cannot honour
    pub fn validate(&self) -> Result<(), SettingsError> {
        let p = &self.physics;
        let w = &self.world;

        if p.substeps == 0 {
            return Err(SettingsError::Invalid("physics.substeps must be at least 1"));
        }
        if p.avatar_radius <= 0.0 {
            return Err(SettingsError::Invalid("physics.avatar_radius must be positive"));
        }
        if p.bounce_gain <= 1.0 {
            return Err(SettingsError::Invalid("physics.bounce_gain must exceed 1"));
        }
        if !(0.0..1.0).contains(&p.boundary_restitution) {
            return Err(SettingsError::Invalid(
                "physics.boundary_restitution must be in [0, 1)",
            ));
        }
        if w.gap_min <= 0.0 || w.gap_min > w.gap_max {
            return Err(SettingsError::Invalid("world.gap_min must be in (0, gap_max]"));
        }
        if w.initial_platforms < 10 {
            return Err(SettingsError::Invalid("world.initial_platforms must be at least 10"));
        }
        if w.platform_thickness <= 0.0
            || w.platform_width_min <= 0.0
            || w.platform_width_min > w.platform_width_max
            || w.vertical_height_min > w.vertical_height_max
        {
            return Err(SettingsError::Invalid("world platform size ranges are inconsistent"));
        }
        if w.platform_width_max > w.width || w.vertical_width > w.width {
            return Err(SettingsError::Invalid("platforms must fit inside world.width"));
        }
        if w.weight_normal + w.weight_bouncy + w.weight_vertical == 0 {
            return Err(SettingsError::Invalid("world material weights sum to zero"));
        }
        // A platform the avatar can still touch must never be pruned
        if w.prune_margin < w.death_margin + p.avatar_radius {
            return Err(SettingsError::Invalid(
                "world.prune_margin must be >= death_margin + avatar_radius",
            ));
        }
        if self.camera.smooth_time <= 0.0 {
            return Err(SettingsError::Invalid("camera.smooth_time must be positive"));
        }
        if self.score.units_per_meter <= 0.0 || self.score.report_step == 0 {
            return Err(SettingsError::Invalid("score tuning must be positive"));
        }
        Ok(())
    }
}

/// Errors that can occur when loading settings
#[derive(Debug)]
pub enum SettingsError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, serde_json::Error),
    Invalid(&'static str),
}

impl std::fmt::Display for SettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsError::Io(path, e) => write!(f, "failed to read {}: {e}", path.display()),
            SettingsError::Parse(path, e) => write!(f, "failed to parse {}: {e}", path.display()),
            SettingsError::Invalid(reason) => write!(f, "invalid settings: {reason}"),
        }
    }
}

impl std::error::Error for SettingsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SettingsError::Io(_, e) => Some(e),
            SettingsError::Parse(_, e) => Some(e),
            SettingsError::Invalid(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        Settings::default().validate().unwrap();
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let json = r#"{ "physics": { "gravity": 0.8 }, "score": { "report_step": 25 } }"#;
        let settings: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.physics.gravity, 0.8);
        assert_eq!(settings.physics.substeps, COLLISION_SUBSTEPS);
        assert_eq!(settings.score.report_step, 25);
        assert_eq!(settings.world.width, WORLD_WIDTH);
    }

    #[test]
    fn test_rejects_prune_margin_inside_death_line() {
        let mut settings = Settings::default();
        settings.world.prune_margin = settings.world.death_margin;
        assert!(matches!(settings.validate(), Err(SettingsError::Invalid(_))));
    }

    #[test]
    fn test_rejects_inverted_gap_range() {
        let mut settings = Settings::default();
        settings.world.gap_min = 200.0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = Settings::load(Path::new("/nonexistent/tilt-climber.json")).unwrap_err();
        assert!(matches!(err, SettingsError::Io(_, _)));
    }
}
