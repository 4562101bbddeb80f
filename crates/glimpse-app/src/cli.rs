//! Command line flags.
//!
//! Priority: CLI flags > `GLIMPSE_*` env vars > profile file > defaults.

use std::path::PathBuf;

use clap::Parser;
use glimpse_config::{Config, ConfigError};
use glimpse_types::{CaptureKind, EngineKind, FlipPolicy};

/// Live OCR over a camera feed
#[derive(Parser, Debug)]
#[command(name = "glimpse", version, about)]
pub struct CliArgs {
    /// JSON profile to load instead of the defaults
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// OCR backend: tesseract, http or mock
    #[arg(short = 'e', long = "engine")]
    pub engine: Option<EngineKind>,

    /// Tesseract language model(s), e.g. "eng" or "eng+deu"
    #[arg(short = 'l', long = "language")]
    pub language: Option<String>,

    /// Image-to-text endpoint for the http backend
    #[arg(long = "model-url")]
    pub model_url: Option<String>,

    /// Frame source: directory, still, camera or mock
    #[arg(long = "capture")]
    pub capture: Option<CaptureKind>,

    /// Frame directory or image file for the capture source
    #[arg(short = 'p', long = "capture-path")]
    pub capture_path: Option<PathBuf>,

    /// Video device index for the camera source
    #[arg(long = "device")]
    pub device: Option<i32>,

    /// Delay between recognition attempts in ms
    #[arg(short = 'd', long = "delay", allow_hyphen_values = true)]
    pub delay: Option<String>,

    /// display-only or mirror-input
    #[arg(long = "flip-policy")]
    pub flip_policy: Option<FlipPolicy>,

    /// Start with the camera mirrored
    #[arg(long = "flipped")]
    pub flipped: bool,

    /// Begin recognizing immediately
    #[arg(long = "start")]
    pub start: bool,

    /// Do not show "Processing..." while a frame is being recognized
    #[arg(long = "no-processing")]
    pub no_processing: bool,

    /// Give up on engine initialization after this many ms
    #[arg(long = "init-timeout")]
    pub init_timeout_ms: Option<u64>,

    /// Log filter when RUST_LOG is unset (trace, debug, info, warn, error)
    #[arg(long = "log-level", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON
    #[arg(long = "log-json")]
    pub log_json: bool,
}

impl CliArgs {
    /// Profile path: --config flag > GLIMPSE_CONFIG env var
    pub fn resolve_config_path(&self) -> Option<PathBuf> {
        self.config
            .clone()
            .or_else(|| std::env::var("GLIMPSE_CONFIG").ok().map(PathBuf::from))
    }

    /// Load the profile or env defaults, then apply flag overrides
    pub fn resolve_config(&self) -> Result<Config, ConfigError> {
        let mut config = match self.resolve_config_path() {
            Some(path) => Config::load(&path)?,
            None => Config::new()?,
        };
        self.apply(&mut config);
        Ok(config)
    }

    fn apply(&self, config: &mut Config) {
        if let Some(engine) = self.engine {
            config.ocr.engine = engine;
        }
        if let Some(language) = &self.language {
            config.ocr.language = language.clone();
        }
        if let Some(url) = &self.model_url {
            config.ocr.model_url = url.clone();
        }
        if let Some(capture) = self.capture {
            config.capture.source = capture;
        }
        if let Some(path) = &self.capture_path {
            config.capture.path = Some(path.clone());
        }
        if let Some(device) = self.device {
            config.capture.device = device;
        }
        if let Some(delay) = &self.delay {
            config.scheduler.delay_ms = config.scheduler.parse_delay(delay).as_millis() as u64;
        }
        if let Some(policy) = self.flip_policy {
            config.capture.flip_policy = policy;
        }
        if self.flipped {
            config.capture.flipped = true;
        }
        if self.start {
            config.scheduler.start_active = true;
        }
        if self.no_processing {
            config.scheduler.show_processing = false;
        }
        if let Some(timeout) = self.init_timeout_ms {
            config.scheduler.init_timeout_ms = Some(timeout);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let args = CliArgs::parse_from([
            "glimpse",
            "--engine",
            "mock",
            "--capture",
            "still",
            "-p",
            "card.png",
            "--delay",
            "300",
            "--flip-policy",
            "mirror-input",
            "--flipped",
            "--no-processing",
            "--device",
            "1",
        ]);

        let mut config = Config::default();
        args.apply(&mut config);

        assert_eq!(config.ocr.engine, EngineKind::Mock);
        assert_eq!(config.capture.source, CaptureKind::Still);
        assert_eq!(config.capture.path, Some(PathBuf::from("card.png")));
        assert_eq!(config.scheduler.delay_ms, 300);
        assert_eq!(config.capture.flip_policy, FlipPolicy::MirrorInput);
        assert!(config.capture.flipped);
        assert!(!config.scheduler.show_processing);
        assert_eq!(config.capture.device, 1);
    }

    #[test]
    fn negative_delay_flag_uses_default() {
        let args = CliArgs::parse_from(["glimpse", "--delay", "-5"]);
        let mut config = Config::default();
        config.scheduler.delay_ms = 250;
        args.apply(&mut config);
        assert_eq!(config.scheduler.delay_ms, 1000);
    }

    #[test]
    fn fractional_delay_flag_truncates() {
        let args = CliArgs::parse_from(["glimpse", "--delay", "250.5"]);
        let mut config = Config::default();
        args.apply(&mut config);
        assert_eq!(config.scheduler.delay_ms, 250);
    }

    #[test]
    fn unknown_engine_is_rejected() {
        assert!(CliArgs::try_parse_from(["glimpse", "--engine", "paddle"]).is_err());
    }
}
