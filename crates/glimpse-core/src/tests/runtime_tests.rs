//! Scheduler behaviour on a real clock

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use glimpse_config::scheduler::SchedulerConfig;
use glimpse_ocr::mock::{MockCaptureSource, MockOcrEngine, MockReply};
use glimpse_ocr::{CaptureSource, Snapshot};
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;

use crate::scheduler::{SchedulerOptions, spawn_scheduler};

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn options(delay_ms: u64) -> SchedulerOptions {
    SchedulerOptions {
        scheduler: SchedulerConfig {
            delay_ms,
            show_processing: false,
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Capture that blocks its thread, like a disk read or a device wait
struct SlowCapture {
    frame: Snapshot,
    delay: Duration,
    entered: Arc<AtomicUsize>,
}

impl CaptureSource for SlowCapture {
    fn capture_snapshot(&self) -> Option<Snapshot> {
        self.entered.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        Some(self.frame.clone())
    }
}

#[tokio::test]
async fn test_slow_capture_does_not_block_runtime() {
    let frame = MockCaptureSource::solid()
        .unwrap()
        .capture_snapshot()
        .unwrap();
    let entered = Arc::new(AtomicUsize::new(0));
    let capture = SlowCapture {
        frame,
        delay: ms(400),
        entered: entered.clone(),
    };
    let handle = spawn_scheduler(
        Box::new(capture),
        Box::new(MockOcrEngine::with_text("HELLO")),
        options(1000),
        CancellationToken::new(),
    );

    let started = Instant::now();
    handle.start();
    timeout(Duration::from_secs(2), async {
        while entered.load(Ordering::SeqCst) == 0 {
            sleep(ms(1)).await;
        }
    })
    .await
    .expect("capture never started");
    sleep(ms(20)).await;

    assert!(
        started.elapsed() < ms(250),
        "runtime stalled for {:?} while capturing",
        started.elapsed()
    );
    assert_eq!(handle.text(), "", "capture still in progress");

    handle.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_nothing_published_after_stop_returns() {
    let replies = (0..2000).map(|i| MockReply::Text(format!("frame {i}"))).collect();
    let handle = spawn_scheduler(
        Box::new(MockCaptureSource::solid().unwrap()),
        Box::new(MockOcrEngine::scripted(replies)),
        options(100),
        CancellationToken::new(),
    );

    for _ in 0..100 {
        handle.start();
        sleep(ms(1)).await;
        handle.stop();

        let at_stop = handle.text();
        sleep(ms(3)).await;
        assert_eq!(handle.text(), at_stop);
    }

    handle.shutdown().await;
}
