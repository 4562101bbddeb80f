use glimpse_types::EngineKind;
use serde::{Deserialize, Serialize};

fn default_language() -> String {
    "eng".to_string()
}

fn default_tesseract_path() -> String {
    "tesseract".to_string()
}

fn default_model_url() -> String {
    "http://localhost:8000/models/trocr-base-printed".to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct OcrConfig {
    pub engine: EngineKind,
    #[serde(default = "default_language")]
    pub language: String,
    /// Executable used by the tesseract backend
    #[serde(default = "default_tesseract_path")]
    pub tesseract_path: String,
    /// Tesseract page segmentation mode
    pub psm: Option<u8>,
    /// Image-to-text inference endpoint for the http backend
    #[serde(default = "default_model_url")]
    pub model_url: String,
    pub api_token: Option<String>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            engine: EngineKind::default(),
            language: default_language(),
            tesseract_path: default_tesseract_path(),
            psm: None,
            model_url: default_model_url(),
            api_token: None,
        }
    }
}
