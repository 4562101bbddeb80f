use std::path::PathBuf;
use std::time::Duration;

use glimpse_types::{CaptureKind, FlipPolicy};
use serde::{Deserialize, Serialize};

fn default_frame_interval_ms() -> u64 {
    33
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct CaptureConfig {
    pub source: CaptureKind,
    /// Frame directory for `directory`, image file for `still`
    pub path: Option<PathBuf>,
    /// Video device index for `camera`
    pub device: i32,
    /// Pause between camera reads
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,
    pub flip_policy: FlipPolicy,
    /// Start mirrored
    pub flipped: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            source: CaptureKind::default(),
            path: None,
            device: 0,
            frame_interval_ms: default_frame_interval_ms(),
            flip_policy: FlipPolicy::default(),
            flipped: false,
        }
    }
}

impl CaptureConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}
