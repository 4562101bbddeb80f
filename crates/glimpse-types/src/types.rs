use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Shown while a recognition call is in flight
pub const PROCESSING_TEXT: &str = "Processing...";

/// Shown when the OCR engine rejects a snapshot
pub const OCR_ERROR_TEXT: &str = "Error performing OCR.";

#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Start/pause button
    ToggleOcr,
    StartOcr,
    PauseOcr,
    /// Flip/unflip button
    ToggleFlip,
    /// Raw contents of the delay input, validated by the receiver
    SetDelay(String),
    StatusRequest,
    Quit,
    TextUpdated(String),
    EngineStateChanged(EngineState),
    StatusUpdate(StatusReport),
}

/// Snapshot of the user-visible controls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub active: bool,
    pub flipped: bool,
    pub delay_ms: u64,
    pub engine: EngineState,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EngineState {
    #[default]
    Initializing,
    Ready,
    /// Initialization failed or timed out; the engine is never called
    Unavailable(String),
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineState::Initializing => write!(f, "initializing"),
            EngineState::Ready => write!(f, "ready"),
            EngineState::Unavailable(reason) => write!(f, "unavailable ({reason})"),
        }
    }
}

/// Whether mirroring the camera also mirrors the image handed to OCR
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlipPolicy {
    #[default]
    DisplayOnly,
    MirrorInput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EngineKind {
    #[default]
    Tesseract,
    Http,
    Mock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CaptureKind {
    #[default]
    Directory,
    Still,
    /// Video device, needs the `camera` build feature
    Camera,
    Mock,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown value '{0}'")]
pub struct UnknownVariant(pub String);

impl FromStr for FlipPolicy {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "display-only" | "display" => Ok(FlipPolicy::DisplayOnly),
            "mirror-input" | "mirror" => Ok(FlipPolicy::MirrorInput),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

impl FromStr for EngineKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tesseract" => Ok(EngineKind::Tesseract),
            "http" | "model" => Ok(EngineKind::Http),
            "mock" => Ok(EngineKind::Mock),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

impl FromStr for CaptureKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "directory" | "dir" => Ok(CaptureKind::Directory),
            "still" | "file" => Ok(CaptureKind::Still),
            "camera" | "webcam" => Ok(CaptureKind::Camera),
            "mock" => Ok(CaptureKind::Mock),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_policy_aliases() {
        assert_eq!("mirror".parse::<FlipPolicy>(), Ok(FlipPolicy::MirrorInput));
        assert_eq!(
            " Display-Only ".parse::<FlipPolicy>(),
            Ok(FlipPolicy::DisplayOnly)
        );
        assert!("sideways".parse::<FlipPolicy>().is_err());
    }

    #[test]
    fn unknown_variant_message() {
        let err = "paddle".parse::<EngineKind>().unwrap_err();
        assert_eq!(err.to_string(), "unknown value 'paddle'");
        assert_eq!("webcam".parse::<CaptureKind>(), Ok(CaptureKind::Camera));
    }

    #[test]
    fn engine_state_display() {
        assert_eq!(EngineState::Ready.to_string(), "ready");
        assert_eq!(
            EngineState::Unavailable("no eng.traineddata".into()).to_string(),
            "unavailable (no eng.traineddata)"
        );
    }
}
