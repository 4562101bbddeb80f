use anyhow::Context;
use clap::Parser;
use tokio::signal;
use tracing_subscriber::EnvFilter;

mod cli;
mod controller;
mod events;
mod io;
mod ui;

use self::cli::CliArgs;
use self::controller::AppController;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = CliArgs::parse();

    init_tracing(&args);
    tracing::info!("Starting glimpse v{}", env!("CARGO_PKG_VERSION"));

    let config = args
        .resolve_config()
        .context("Failed to load configuration")?;
    tracing::debug!(
        "Config: engine={:?} capture={:?} delay={}ms",
        config.ocr.engine,
        config.capture.source,
        config.scheduler.delay_ms
    );

    let capture = glimpse_ocr::build_capture(&config.capture)
        .context("Failed to open capture source")?;
    let engine = glimpse_ocr::build_engine(&config.ocr);
    tracing::info!("Using {} engine", engine.name());

    let controller = AppController::new();
    let mut tasks = controller.spawn_tasks(capture, engine, &config)?;

    tokio::select! {
        result = signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::error!("Failed to listen for ctrl+c: {e}");
            }
            tracing::info!("Shutdown requested");
        }
        Some(result) = tasks.join_next() => {
            match result {
                Ok(Ok(())) => tracing::debug!("task exited"),
                Ok(Err(e)) => tracing::error!("task failed: {e:#}"),
                Err(e) => tracing::error!("task panicked: {e}"),
            }
        }
    }

    controller.shutdown();
    while let Some(result) = tasks.join_next().await {
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!("task failed during shutdown: {e:#}"),
            Err(e) => tracing::error!("task panicked: {e}"),
        }
    }

    tracing::info!("Goodbye");
    Ok(())
}

fn init_tracing(args: &CliArgs) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(atty::is(atty::Stream::Stderr));

    if args.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}
