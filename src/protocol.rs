//! Wire messages between host and controller
//!
//! Each message is one JSON object tagged by `type`. Decoding is strict about
//! shape but never panics; callers drop anything that fails to decode.

use serde::{Deserialize, Serialize};

use crate::input::TiltVector;

/// Controller → host
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ControllerMessage {
    Tilt { vector: TiltVector },
    Jump,
}

/// Host → controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum HostMessage {
    /// Haptic pulse length in milliseconds
    Vibrate { duration: u32 },
    /// Display string, e.g. "120m"
    Score { value: String },
}

impl HostMessage {
    pub fn score_meters(meters: u32) -> Self {
        HostMessage::Score {
            value: format!("{meters}m"),
        }
    }
}

/// Why a frame was rejected
#[derive(Debug)]
pub enum ProtocolError {
    /// Not JSON, or JSON of the wrong shape
    Malformed(serde_json::Error),
    /// Well-formed but with an unrecognized `type`
    UnknownType(String),
    /// Tagged record without a string `type`
    MissingType,
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtocolError::Malformed(e) => write!(f, "malformed message: {e}"),
            ProtocolError::UnknownType(t) => write!(f, "unknown message type: {t:?}"),
            ProtocolError::MissingType => write!(f, "message has no type tag"),
        }
    }
}

impl std::error::Error for ProtocolError {}

const CONTROLLER_TYPES: &[&str] = &["tilt", "jump"];
const HOST_TYPES: &[&str] = &["vibrate", "score"];

fn decode<T: serde::de::DeserializeOwned>(frame: &str, known: &[&str]) -> Result<T, ProtocolError> {
    let value: serde_json::Value = serde_json::from_str(frame).map_err(ProtocolError::Malformed)?;
    let tag = value
        .get("type")
        .and_then(|t| t.as_str())
        .ok_or(ProtocolError::MissingType)?;
    if !known.contains(&tag) {
        return Err(ProtocolError::UnknownType(tag.to_string()));
    }
    serde_json::from_value(value).map_err(ProtocolError::Malformed)
}

/// Decode a frame received by the host
pub fn decode_controller(frame: &str) -> Result<ControllerMessage, ProtocolError> {
    decode(frame, CONTROLLER_TYPES)
}

/// Decode a frame received by the controller
pub fn decode_host(frame: &str) -> Result<HostMessage, ProtocolError> {
    decode(frame, HOST_TYPES)
}
