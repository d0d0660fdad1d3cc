//! Controller-side input mapping
//!
//! Turns device orientation samples into tilt vectors and activate gestures
//! into jump requests. Every sample produces a message; there is no
//! debouncing here. The host's `Stuck` guard is what makes extra jumps
//! harmless.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::cartesian_to_polar;
use crate::protocol::ControllerMessage;
use crate::settings::InputTuning;

/// Aim and strength derived from device tilt
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TiltVector {
    pub x: f32,
    pub y: f32,
    /// Length of (x, y), capped
    pub magnitude: f32,
    /// atan2(y, x), radians
    pub angle: f32,
}

impl TiltVector {
    /// Build from already-scaled components, capping the magnitude
    pub fn from_components(x: f32, y: f32, max_magnitude: f32) -> Self {
        let (length, angle) = cartesian_to_polar(Vec2::new(x, y));
        Self {
            x,
            y,
            magnitude: length.min(max_magnitude),
            angle,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.magnitude.is_finite() && self.angle.is_finite()
    }
}

/// One orientation reading, in degrees; a level device reads (0, 0)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OrientationSample {
    /// Left-right tilt (gamma)
    pub left_right: f32,
    /// Front-back tilt (beta)
    pub front_back: f32,
}

/// Maps raw device input to controller messages
#[derive(Debug, Clone)]
pub struct ControlInputMapper {
    sensitivity: f32,
    max_magnitude: f32,
    current: TiltVector,
}

impl ControlInputMapper {
    pub fn new(tuning: &InputTuning) -> Self {
        Self {
            sensitivity: tuning.sensitivity,
            max_magnitude: tuning.max_magnitude,
            current: TiltVector::default(),
        }
    }

    /// Latest tilt derived from the sensor
    pub fn current(&self) -> TiltVector {
        self.current
    }

    /// Map an orientation sample; always yields a fresh tilt message
    pub fn on_orientation(&mut self, sample: OrientationSample) -> ControllerMessage {
        let finite_or_level = |deg: f32| if deg.is_finite() { deg } else { 0.0 };
        let x = finite_or_level(sample.left_right) * self.sensitivity;
        let y = finite_or_level(sample.front_back) * self.sensitivity;
        self.current = TiltVector::from_components(x, y, self.max_magnitude);
        ControllerMessage::Tilt {
            vector: self.current,
        }
    }

    /// Button press or touch
    pub fn on_activate(&self) -> ControllerMessage {
        ControllerMessage::Jump
    }
}

/// Input events read from a device feed
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeviceEvent {
    Orientation(OrientationSample),
    Activate,
}

/// A device feed line that could not be understood
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceLineError {
    UnknownCommand(String),
    BadNumber(String),
    MissingAngle,
}

impl std::fmt::Display for DeviceLineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownCommand(cmd) => write!(f, "unknown command: {cmd}"),
            Self::BadNumber(token) => write!(f, "not a number: {token}"),
            Self::MissingAngle => write!(f, "tilt needs two angles: tilt <left_right> <front_back>"),
        }
    }
}

impl std::error::Error for DeviceLineError {}

/// Parse one line of a text device feed
///
/// `tilt <lr> <fb>` (or `t`) is an orientation sample in degrees; `jump`,
/// `j` or an empty line is an activate gesture.
pub fn parse_device_line(line: &str) -> Result<DeviceEvent, DeviceLineError> {
    let mut tokens = line.split_whitespace();
    let Some(command) = tokens.next() else {
        return Ok(DeviceEvent::Activate);
    };

    match command.to_ascii_lowercase().as_str() {
        "jump" | "j" => Ok(DeviceEvent::Activate),
        "tilt" | "t" => {
            let mut angle = || -> Result<f32, DeviceLineError> {
                let token = tokens.next().ok_or(DeviceLineError::MissingAngle)?;
                token
                    .parse::<f32>()
                    .map_err(|_| DeviceLineError::BadNumber(token.to_string()))
            };
            let left_right = angle()?;
            let front_back = angle()?;
            Ok(DeviceEvent::Orientation(OrientationSample {
                left_right,
                front_back,
            }))
        }
        other => Err(DeviceLineError::UnknownCommand(other.to_string())),
    }
}
