use std::env;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use self::capture::CaptureConfig;
use self::ocr::OcrConfig;
use self::scheduler::SchedulerConfig;

pub mod capture;
pub mod ocr;
pub mod scheduler;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: &'static str, message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub scheduler: SchedulerConfig,
    pub capture: CaptureConfig,
    pub ocr: OcrConfig,
}

impl Config {
    /// Defaults overridden by `GLIMPSE_*` environment variables
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`Config::new`] but reads variables through `lookup`
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Config::default();
        config.apply_lookup(lookup)?;
        Ok(config)
    }

    /// Load a JSON profile, then let the environment override it
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Config =
            serde_json::from_reader(BufReader::new(file)).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.apply_lookup(|key| env::var(key).ok())?;
        Ok(config)
    }

    fn apply_lookup(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(v) = lookup("GLIMPSE_DELAY_MS") {
            self.scheduler.delay_ms = self.scheduler.parse_delay(&v).as_millis() as u64;
        }

        if let Some(v) = lookup("GLIMPSE_INIT_TIMEOUT_MS") {
            self.scheduler.init_timeout_ms = Some(v.trim().parse().map_err(|_| {
                ConfigError::InvalidValue {
                    key: "GLIMPSE_INIT_TIMEOUT_MS",
                    message: format!("'{v}' is not a number of milliseconds"),
                }
            })?);
        }

        if let Some(v) = lookup("GLIMPSE_ENGINE") {
            self.ocr.engine = v.parse().map_err(|e| ConfigError::InvalidValue {
                key: "GLIMPSE_ENGINE",
                message: format!("{e}"),
            })?;
        }

        if let Some(v) = lookup("GLIMPSE_LANGUAGE") {
            self.ocr.language = v;
        }

        if let Some(v) = lookup("GLIMPSE_TESSERACT_PATH") {
            self.ocr.tesseract_path = v;
        }

        if let Some(v) = lookup("GLIMPSE_MODEL_URL") {
            self.ocr.model_url = v;
        }

        if let Some(v) = lookup("GLIMPSE_API_TOKEN") {
            self.ocr.api_token = Some(v);
        }

        if let Some(v) = lookup("GLIMPSE_CAPTURE") {
            self.capture.source = v.parse().map_err(|e| ConfigError::InvalidValue {
                key: "GLIMPSE_CAPTURE",
                message: format!("{e}"),
            })?;
        }

        if let Some(v) = lookup("GLIMPSE_CAPTURE_PATH") {
            self.capture.path = Some(PathBuf::from(v));
        }

        if let Some(v) = lookup("GLIMPSE_CAMERA_DEVICE") {
            self.capture.device = v.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "GLIMPSE_CAMERA_DEVICE",
                message: format!("'{v}' is not a device index"),
            })?;
        }

        if let Some(v) = lookup("GLIMPSE_FLIP_POLICY") {
            self.capture.flip_policy = v.parse().map_err(|e| ConfigError::InvalidValue {
                key: "GLIMPSE_FLIP_POLICY",
                message: format!("{e}"),
            })?;
        }

        Ok(())
    }
}
