//! Tilt Climber - a motion-controlled climbing game
//!
//! Core modules:
//! - `sim`: Deterministic simulation (physics, swept collisions, world generation)
//! - `input`: Controller-side mapping of device orientation to tilt/jump messages
//! - `protocol`: Wire messages exchanged between host and controller
//! - `transport`: Two-peer message channel (TCP, newline-delimited JSON)
//! - `pairing`: Join links carrying the host's session identifier
//! - `session`: Host-authoritative session coordinator
//! - `settings`: Data-driven tuning
//! - `highscores`: Best heights for the current session

pub mod highscores;
pub mod input;
pub mod pairing;
pub mod protocol;
pub mod session;
pub mod settings;
pub mod sim;
pub mod transport;

pub use highscores::HighScores;
pub use input::{ControlInputMapper, OrientationSample, TiltVector};
pub use protocol::{ControllerMessage, HostMessage};
pub use session::{ConnectionState, GamePhase, SessionCoordinator};
pub use settings::Settings;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz, one nominal frame)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum catch-up ticks per wakeup to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Velocities are expressed in world units per nominal frame
    pub const NOMINAL_FRAME_RATE: f32 = 60.0;

    /// World dimensions
    pub const WORLD_WIDTH: f32 = 800.0;
    pub const VIEWPORT_HEIGHT: f32 = 600.0;
    pub const FLOOR_Y: f32 = 560.0;
    pub const FLOOR_HEIGHT: f32 = 40.0;

    /// Avatar defaults
    pub const AVATAR_RADIUS: f32 = 15.0;
    /// Downward acceleration (units/frame²)
    pub const GRAVITY: f32 = 0.5;
    /// Horizontal drag applied once per frame (multiplicative)
    pub const AIR_FRICTION: f32 = 0.99;
    /// Position sub-steps per frame for swept collision
    pub const COLLISION_SUBSTEPS: u32 = 16;
    /// Speed ceiling, keeps bounce chains from running away
    pub const MAX_SPEED: f32 = 60.0;

    /// Jump tuning
    pub const FORCE_MULTIPLIER: f32 = 0.35;
    pub const FORCE_CAP: f32 = 25.0;
    /// Haptic pulse length per unit of jump force
    pub const VIBRATE_MS_PER_FORCE: f32 = 5.0;

    /// Material response
    pub const BOUNCE_GAIN: f32 = 1.1;
    pub const BOUNCE_NUDGE: f32 = 0.5;
    pub const BOUNDARY_RESTITUTION: f32 = 0.8;

    /// Controller tilt mapping (units per degree)
    pub const TILT_SENSITIVITY: f32 = 2.0;
    pub const TILT_MAX_MAGNITUDE: f32 = 100.0;

    /// Level generation
    pub const GAP_MIN: f32 = 80.0;
    pub const GAP_MAX: f32 = 150.0;
    pub const INITIAL_PLATFORMS: u32 = 12;
    pub const PLATFORM_THICKNESS: f32 = 20.0;
    pub const PLATFORM_WIDTH_MIN: f32 = 80.0;
    pub const PLATFORM_WIDTH_MAX: f32 = 160.0;
    pub const VERTICAL_WIDTH: f32 = 20.0;
    pub const VERTICAL_HEIGHT_MIN: f32 = 100.0;
    pub const VERTICAL_HEIGHT_MAX: f32 = 160.0;
    /// Material weights (percent)
    pub const WEIGHT_NORMAL: u32 = 70;
    pub const WEIGHT_BOUNCY: u32 = 20;
    pub const WEIGHT_VERTICAL: u32 = 10;
    /// Generate while the camera is within this distance of the top
    pub const LOOKAHEAD: f32 = 600.0;
    /// Platforms this far below the viewport bottom are dropped
    pub const PRUNE_MARGIN: f32 = 200.0;
    /// Avatar this far below the viewport bottom is dead
    pub const DEATH_MARGIN: f32 = 100.0;

    /// Camera follow
    pub const CAMERA_SMOOTH_TIME: f32 = 0.3;
    /// Fraction of the viewport above the avatar when the camera is settled
    pub const CAMERA_ANCHOR: f32 = 0.6;

    /// Scoring
    pub const UNITS_PER_METER: f32 = 10.0;
    pub const SCORE_REPORT_STEP: u32 = 10;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    if !angle.is_finite() {
        return 0.0;
    }
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Convert polar (r, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f32, theta: f32) -> Vec2 {
    Vec2::new(r * theta.cos(), r * theta.sin())
}

/// Convert cartesian (x, y) to polar (r, theta)
#[inline]
pub fn cartesian_to_polar(pos: Vec2) -> (f32, f32) {
    (pos.length(), pos.y.atan2(pos.x))
}
