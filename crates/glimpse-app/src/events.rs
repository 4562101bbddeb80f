use glimpse_core::SchedulerHandle;
use glimpse_types::AppEvent;
use kanal::{AsyncReceiver, AsyncSender};
use tokio_util::sync::CancellationToken;

/// App's main loop: applies user controls to the scheduler and forwards its
/// observable state to the display
pub async fn event_loop(
    scheduler: SchedulerHandle,
    ui_to_app_rx: AsyncReceiver<AppEvent>,
    app_to_ui_tx: AsyncSender<AppEvent>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let mut text_rx = scheduler.subscribe_text();
    let mut engine_rx = scheduler.subscribe_engine();

    app_to_ui_tx
        .send(AppEvent::StatusUpdate(scheduler.status()))
        .await?;

    tracing::info!("[EVENT_LOOP] Starting main loop, waiting for events");
    let result = loop {
        tokio::select! {
            _ = cancel.cancelled() => break Ok(()),
            changed = text_rx.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let text = text_rx.borrow_and_update().clone();
                if app_to_ui_tx.send(AppEvent::TextUpdated(text)).await.is_err() {
                    break Ok(());
                }
            }
            changed = engine_rx.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let state = engine_rx.borrow_and_update().clone();
                if app_to_ui_tx.send(AppEvent::EngineStateChanged(state)).await.is_err() {
                    break Ok(());
                }
            }
            event = ui_to_app_rx.recv() => {
                let event = match event {
                    Ok(event) => event,
                    Err(e) => break Err(anyhow::Error::from(e)),
                };
                tracing::debug!("[EVENT_LOOP] EVENT RECEIVED: {:?}", event);

                if matches!(event, AppEvent::Quit) {
                    tracing::info!("Quit requested");
                    break Ok(());
                }
                if handle_event(&scheduler, event) {
                    let _ = app_to_ui_tx
                        .send(AppEvent::StatusUpdate(scheduler.status()))
                        .await;
                }
            }
        }
    };

    scheduler.shutdown().await;
    cancel.cancel();
    result
}

/// Returns true when the visible controls changed
fn handle_event(scheduler: &SchedulerHandle, event: AppEvent) -> bool {
    match event {
        AppEvent::ToggleOcr => {
            scheduler.toggle();
        }
        AppEvent::StartOcr => scheduler.start(),
        AppEvent::PauseOcr => scheduler.stop(),
        AppEvent::ToggleFlip => {
            scheduler.toggle_flip();
        }
        AppEvent::SetDelay(raw) => {
            scheduler.set_delay_input(&raw);
        }
        AppEvent::StatusRequest => {}
        // Outbound events, never sent by the input side
        AppEvent::Quit
        | AppEvent::TextUpdated(_)
        | AppEvent::EngineStateChanged(_)
        | AppEvent::StatusUpdate(_) => return false,
    }
    true
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use glimpse_config::scheduler::SchedulerConfig;
    use glimpse_core::{SchedulerOptions, spawn_scheduler};
    use glimpse_ocr::mock::{MockCaptureSource, MockOcrEngine};
    use tokio::time::timeout;

    use super::*;

    fn scheduler(cancel: &CancellationToken) -> SchedulerHandle {
        let options = SchedulerOptions {
            scheduler: SchedulerConfig {
                delay_ms: 250,
                show_processing: false,
                ..Default::default()
            },
            ..Default::default()
        };
        spawn_scheduler(
            Box::new(MockCaptureSource::solid().unwrap()),
            Box::new(MockOcrEngine::with_text("HELLO")),
            options,
            cancel.child_token(),
        )
    }

    async fn next_text(rx: &AsyncReceiver<AppEvent>) -> String {
        loop {
            match rx.recv().await.unwrap() {
                AppEvent::TextUpdated(text) => return text,
                _ => continue,
            }
        }
    }

    #[tokio::test]
    async fn test_toggle_produces_text_and_status() {
        let cancel = CancellationToken::new();
        let (ui_tx, ui_rx) = kanal::unbounded_async::<AppEvent>();
        let (app_tx, app_rx) = kanal::unbounded_async::<AppEvent>();

        let handle = tokio::spawn(event_loop(scheduler(&cancel), ui_rx, app_tx, cancel.clone()));

        match timeout(Duration::from_secs(1), app_rx.recv()).await.unwrap().unwrap() {
            AppEvent::StatusUpdate(status) => assert!(!status.active),
            other => panic!("expected initial status, got {other:?}"),
        }

        ui_tx.send(AppEvent::ToggleOcr).await.unwrap();
        let text = timeout(Duration::from_secs(2), next_text(&app_rx)).await.unwrap();
        assert_eq!(text, "HELLO");

        ui_tx.send(AppEvent::Quit).await.unwrap();
        timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_invalid_delay_input_reports_default() {
        let cancel = CancellationToken::new();
        let (ui_tx, ui_rx) = kanal::unbounded_async::<AppEvent>();
        let (app_tx, app_rx) = kanal::unbounded_async::<AppEvent>();

        let handle = tokio::spawn(event_loop(scheduler(&cancel), ui_rx, app_tx, cancel.clone()));
        ui_tx.send(AppEvent::SetDelay("abc".into())).await.unwrap();

        let status = timeout(Duration::from_secs(1), async {
            loop {
                if let AppEvent::StatusUpdate(status) = app_rx.recv().await.unwrap() {
                    if status.delay_ms != 250 {
                        return status;
                    }
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(status.delay_ms, 1000);

        cancel.cancel();
        timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }
}
