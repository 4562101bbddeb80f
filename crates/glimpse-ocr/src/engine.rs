use glimpse_config::ocr::OcrConfig;
use glimpse_types::EngineKind;

use crate::http::HttpModelEngine;
use crate::mock::MockOcrEngine;
use crate::snapshot::Snapshot;
use crate::tesseract::TesseractEngine;

/// Text recognition backend.
///
/// `initialize` runs once before the first `recognize`; callers must not
/// recognize on an engine whose initialization failed.
#[async_trait::async_trait]
pub trait OcrEngine: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &str;

    /// Load models or verify the backend is reachable
    async fn initialize(&mut self) -> Result<(), OcrError>;

    async fn recognize(&self, snapshot: &Snapshot) -> Result<String, OcrError>;

    async fn shutdown(&mut self) {}
}

#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("engine not initialized")]
    NotInitialized,

    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("language model '{0}' is not installed")]
    MissingLanguage(String),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    InvalidResponse(String),
}

/// Construct the backend selected in config
pub fn build_engine(config: &OcrConfig) -> Box<dyn OcrEngine> {
    match config.engine {
        EngineKind::Tesseract => Box::new(TesseractEngine::new(
            &config.tesseract_path,
            &config.language,
            config.psm,
        )),
        EngineKind::Http => Box::new(HttpModelEngine::new(
            config.model_url.clone(),
            config.api_token.clone(),
        )),
        EngineKind::Mock => Box::new(MockOcrEngine::with_text("HELLO")),
    }
}
