use glimpse_config::Config;
use glimpse_core::{SchedulerOptions, spawn_scheduler};
use glimpse_ocr::{CaptureSource, OcrEngine};
use glimpse_types::AppEvent;
use kanal::{AsyncReceiver, AsyncSender};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::events::event_loop;
use crate::io::spawn_stdin_reader;
use crate::ui::display_loop;

/// Centralized channel management
pub struct ChannelSet {
    pub app_to_ui: (AsyncSender<AppEvent>, AsyncReceiver<AppEvent>),
    pub ui_to_app: (AsyncSender<AppEvent>, AsyncReceiver<AppEvent>),
}

impl ChannelSet {
    pub fn new() -> Self {
        Self {
            app_to_ui: kanal::bounded_async(256), // text bursts
            ui_to_app: kanal::bounded_async(64),  // keyboard controls
        }
    }
}

/// Application controller for task spawning and lifecycle
pub struct AppController {
    channels: ChannelSet,
    cancel_token: CancellationToken,
}

impl AppController {
    pub fn new() -> Self {
        Self {
            channels: ChannelSet::new(),
            cancel_token: CancellationToken::new(),
        }
    }

    pub fn spawn_tasks(
        &self,
        capture: Box<dyn CaptureSource>,
        engine: Box<dyn OcrEngine>,
        config: &Config,
    ) -> anyhow::Result<JoinSet<anyhow::Result<()>>> {
        let mut tasks = JoinSet::new();

        let scheduler = spawn_scheduler(
            capture,
            engine,
            SchedulerOptions::from_config(config),
            self.cancel_token.child_token(),
        );

        // Event loop
        tasks.spawn(event_loop(
            scheduler,
            self.channels.ui_to_app.1.clone(),
            self.channels.app_to_ui.0.clone(),
            self.cancel_token.clone(),
        ));

        // Display
        tasks.spawn(display_loop(
            self.channels.app_to_ui.1.clone(),
            self.cancel_token.child_token(),
        ));

        // Keyboard controls
        spawn_stdin_reader(self.channels.ui_to_app.0.clone())?;

        Ok(tasks)
    }

    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }
}
