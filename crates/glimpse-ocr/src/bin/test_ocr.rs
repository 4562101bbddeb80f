//! One-shot OCR check - run with: cargo run -p glimpse-ocr --bin test_ocr -- <image> [engine]

use std::path::PathBuf;

use anyhow::{Context, Result};
use glimpse_config::ocr::OcrConfig;
use glimpse_ocr::{CaptureSource, StillImageSource, build_engine};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let path = PathBuf::from(args.next().context("usage: test_ocr <image> [engine]")?);

    let mut config = OcrConfig::default();
    if let Some(engine) = args.next() {
        config.engine = engine.parse()?;
    }

    tracing::debug!("=== OCR Test ===");

    let source = StillImageSource::open(&path)
        .with_context(|| format!("Failed to load {}", path.display()))?;
    let snapshot = source.capture_snapshot().context("No frame")?;
    tracing::debug!("Loaded {} bytes ({})", snapshot.bytes().len(), snapshot.mime_type());

    let mut engine = build_engine(&config);
    let start = std::time::Instant::now();
    engine
        .initialize()
        .await
        .with_context(|| format!("Failed to initialize {}", engine.name()))?;
    tracing::debug!("{} initialized in {:?}", engine.name(), start.elapsed());

    let start = std::time::Instant::now();
    match engine.recognize(&snapshot).await {
        Ok(text) => {
            tracing::debug!("{:?} - {} chars", start.elapsed(), text.len());
            for line in text.lines().take(5) {
                tracing::debug!("> {}", line);
            }
        }
        Err(e) => tracing::error!("Failed: {}", e),
    }

    engine.shutdown().await;
    tracing::debug!("=== Done ===");
    Ok(())
}
