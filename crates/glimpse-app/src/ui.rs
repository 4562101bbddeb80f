use std::io::Write;

use glimpse_types::{AppEvent, EngineState, StatusReport};
use kanal::AsyncReceiver;
use tokio_util::sync::CancellationToken;

pub fn render_status(status: &StatusReport) -> String {
    let ocr_button = if status.active { "Pause OCR" } else { "Start OCR" };
    let flip_button = if status.flipped { "Unflip Camera" } else { "Flip Camera" };
    format!(
        "[{ocr_button}] [{flip_button}] OCR Delay (ms): {} | engine {}",
        status.delay_ms, status.engine
    )
}

pub fn render_text(text: &str) -> String {
    format!("OCR Output:\n{}", text.trim_end())
}

/// Terminal display: renders everything the app sends to stdout
pub async fn display_loop(
    app_to_ui_rx: AsyncReceiver<AppEvent>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let mut out = std::io::stdout();
    writeln!(
        out,
        "Live OCR: Enter toggles OCR; commands: start, pause, flip, delay <ms>, status, quit"
    )?;

    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = app_to_ui_rx.recv() => match event {
                Ok(event) => event,
                Err(_) => break,
            },
        };

        match event {
            AppEvent::TextUpdated(text) => writeln!(out, "{}", render_text(&text))?,
            AppEvent::StatusUpdate(status) => writeln!(out, "{}", render_status(&status))?,
            AppEvent::EngineStateChanged(EngineState::Unavailable(reason)) => {
                writeln!(out, "OCR unavailable: {reason}")?
            }
            AppEvent::EngineStateChanged(state) => writeln!(out, "OCR engine {state}")?,
            _ => {}
        }
        out.flush()?;
    }

    tracing::debug!("display loop stopping");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_labels_follow_state() {
        let mut status = StatusReport {
            active: false,
            flipped: false,
            delay_ms: 1000,
            engine: EngineState::Ready,
        };
        assert_eq!(
            render_status(&status),
            "[Start OCR] [Flip Camera] OCR Delay (ms): 1000 | engine ready"
        );

        status.active = true;
        status.flipped = true;
        let line = render_status(&status);
        assert!(line.starts_with("[Pause OCR] [Unflip Camera]"));
    }

    #[test]
    fn placeholders_render_as_text() {
        assert_eq!(render_text("Processing..."), "OCR Output:\nProcessing...");
        assert_eq!(render_text("HELLO\n\n"), "OCR Output:\nHELLO");
    }
}
