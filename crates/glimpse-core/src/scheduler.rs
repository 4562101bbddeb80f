//! Capture/recognize loop.
//!
//! One task owns the capture source and the OCR engine. Control handles flip
//! shared atomics and wake the task through a [`Notify`]; the task alone
//! decides when the next attempt runs. Attempts are chained: the next timer
//! is only armed after the previous recognition call has settled, so calls
//! never overlap.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use glimpse_config::Config;
use glimpse_config::scheduler::{SchedulerConfig, leading_integer};
use glimpse_ocr::{CaptureSource, OcrEngine, Snapshot};
use glimpse_types::{EngineState, FlipPolicy, OCR_ERROR_TEXT, PROCESSING_TEXT, StatusReport};
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default)]
pub struct SchedulerOptions {
    pub scheduler: SchedulerConfig,
    pub flip_policy: FlipPolicy,
    pub flipped: bool,
}

impl SchedulerOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            scheduler: config.scheduler.clone(),
            flip_policy: config.capture.flip_policy,
            flipped: config.capture.flipped,
        }
    }
}

const ACTIVE_BIT: u64 = 1;

struct Shared {
    /// Start count in the high bits, `ACTIVE_BIT` set while running.
    /// An attempt's result is kept only if this word is unchanged.
    run: AtomicU64,
    delay_ms: AtomicU64,
    flipped: AtomicBool,
    wake: Notify,
}

impl Shared {
    fn run(&self) -> u64 {
        self.run.load(Ordering::SeqCst)
    }

    fn is_active(&self) -> bool {
        self.run() & ACTIVE_BIT != 0
    }

    fn is_current(&self, run: u64) -> bool {
        self.run() == run
    }

    fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms.load(Ordering::SeqCst))
    }
}

/// Control surface of a running scheduler.
///
/// Dropping the handle tears the scheduler down without waiting for it.
pub struct SchedulerHandle {
    shared: Arc<Shared>,
    config: SchedulerConfig,
    text_rx: watch::Receiver<String>,
    engine_rx: watch::Receiver<EngineState>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

/// Spawn the recognition task on the current tokio runtime.
///
/// The engine is initialized inside the task; starting before it is ready
/// is allowed and takes effect once initialization completes.
pub fn spawn_scheduler(
    capture: Box<dyn CaptureSource>,
    engine: Box<dyn OcrEngine>,
    options: SchedulerOptions,
    cancel: CancellationToken,
) -> SchedulerHandle {
    let shared = Arc::new(Shared {
        run: AtomicU64::new(0),
        delay_ms: AtomicU64::new(options.scheduler.delay().as_millis() as u64),
        flipped: AtomicBool::new(options.flipped),
        wake: Notify::new(),
    });

    let (text_tx, text_rx) = watch::channel(String::new());
    let (engine_tx, engine_rx) = watch::channel(EngineState::Initializing);

    let worker = Worker {
        capture: Arc::from(capture),
        engine,
        shared: shared.clone(),
        text_tx,
        engine_tx,
        show_processing: options.scheduler.show_processing,
        flip_policy: options.flip_policy,
        init_timeout: options.scheduler.init_timeout(),
        cancel: cancel.clone(),
    };
    let task = tokio::spawn(worker.run());

    let handle = SchedulerHandle {
        shared,
        config: options.scheduler,
        text_rx,
        engine_rx,
        cancel,
        task: Some(task),
    };

    if handle.config.start_active {
        handle.start();
    }

    handle
}

impl SchedulerHandle {
    /// Idle -> Running. No-op while already running.
    pub fn start(&self) {
        let started = self
            .shared
            .run
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |run| {
                (run & ACTIVE_BIT == 0).then(|| (((run >> 1) + 1) << 1) | ACTIVE_BIT)
            })
            .is_ok();

        if started {
            tracing::info!("OCR started");
            self.shared.wake.notify_one();
        }
    }

    /// Running -> Idle. A call in flight finishes but its result is dropped.
    pub fn stop(&self) {
        // Taken under the text lock: a result is either published before
        // this returns or never
        let previous = {
            let _text = self.text_rx.borrow();
            self.shared.run.fetch_and(!ACTIVE_BIT, Ordering::SeqCst)
        };
        if previous & ACTIVE_BIT != 0 {
            tracing::info!("OCR paused");
            self.shared.wake.notify_one();
        }
    }

    /// Returns the new active state
    pub fn toggle(&self) -> bool {
        if self.is_active() {
            self.stop();
            false
        } else {
            self.start();
            true
        }
    }

    pub fn is_active(&self) -> bool {
        self.shared.is_active()
    }

    /// Re-arms a pending timer with the new delay. Values under the floor are raised.
    pub fn set_delay(&self, delay: Duration) -> Duration {
        let floor = Duration::from_millis(self.config.min_delay_ms);
        let delay = delay.max(floor);
        let previous = self
            .shared
            .delay_ms
            .swap(delay.as_millis() as u64, Ordering::SeqCst);

        if previous != delay.as_millis() as u64 {
            tracing::info!("OCR delay set to {:?}", delay);
            self.shared.wake.notify_one();
        }
        delay
    }

    /// Apply raw delay input; see [`SchedulerConfig::parse_delay`]
    pub fn set_delay_input(&self, input: &str) -> Duration {
        let delay = self.config.parse_delay(input);
        if leading_integer(input).is_none_or(|ms| ms <= 0) {
            tracing::warn!("Invalid delay '{}', using default {:?}", input, delay);
        }
        self.set_delay(delay)
    }

    pub fn delay(&self) -> Duration {
        self.shared.delay()
    }

    /// Returns the new flip state
    pub fn toggle_flip(&self) -> bool {
        let flipped = !self.shared.flipped.fetch_xor(true, Ordering::SeqCst);
        tracing::info!("Camera {}", if flipped { "flipped" } else { "unflipped" });
        flipped
    }

    pub fn is_flipped(&self) -> bool {
        self.shared.flipped.load(Ordering::SeqCst)
    }

    /// Latest recognized text or placeholder
    pub fn text(&self) -> String {
        self.text_rx.borrow().clone()
    }

    pub fn subscribe_text(&self) -> watch::Receiver<String> {
        self.text_rx.clone()
    }

    pub fn engine_state(&self) -> EngineState {
        self.engine_rx.borrow().clone()
    }

    pub fn subscribe_engine(&self) -> watch::Receiver<EngineState> {
        self.engine_rx.clone()
    }

    pub fn status(&self) -> StatusReport {
        StatusReport {
            active: self.is_active(),
            flipped: self.is_flipped(),
            delay_ms: self.delay().as_millis() as u64,
            engine: self.engine_state(),
        }
    }

    /// Stop, cancel the pending timer and wait for the capture source and
    /// engine to be released
    pub async fn shutdown(mut self) {
        self.stop();
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!("scheduler task panicked: {e}");
            }
        }
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

enum Wait {
    Tick,
    Interrupted,
    Cancelled,
}

struct Worker {
    capture: Arc<dyn CaptureSource>,
    engine: Box<dyn OcrEngine>,
    shared: Arc<Shared>,
    text_tx: watch::Sender<String>,
    engine_tx: watch::Sender<EngineState>,
    show_processing: bool,
    flip_policy: FlipPolicy,
    init_timeout: Option<Duration>,
    cancel: CancellationToken,
}

impl Worker {
    async fn run(mut self) {
        let cancel = self.cancel.clone();
        let ready = tokio::select! {
            _ = cancel.cancelled() => false,
            ready = self.prepare_engine() => ready,
        };

        if ready {
            self.schedule().await;
        } else {
            // Unavailable engine: attempts are no-ops until teardown
            cancel.cancelled().await;
        }

        self.teardown().await;
    }

    async fn prepare_engine(&mut self) -> bool {
        let name = self.engine.name().to_string();
        tracing::info!("Initializing {} engine", name);

        let result = match self.init_timeout {
            Some(limit) => match tokio::time::timeout(limit, self.engine.initialize()).await {
                Ok(result) => result.map_err(|e| e.to_string()),
                Err(_) => Err(format!("initialization timed out after {limit:?}")),
            },
            None => self.engine.initialize().await.map_err(|e| e.to_string()),
        };

        match result {
            Ok(()) => {
                tracing::info!("{} engine ready", name);
                self.engine_tx.send_replace(EngineState::Ready);
                true
            }
            Err(reason) => {
                tracing::error!("{} engine unavailable: {}", name, reason);
                self.engine_tx.send_replace(EngineState::Unavailable(reason));
                false
            }
        }
    }

    async fn schedule(&self) {
        loop {
            // Idle
            while !self.shared.is_active() {
                tokio::select! {
                    _ = self.cancel.cancelled() => return,
                    _ = self.shared.wake.notified() => {}
                }
            }

            // Running: the first attempt of a run is immediate
            let run = self.shared.run();
            loop {
                tokio::select! {
                    _ = self.cancel.cancelled() => return,
                    _ = self.attempt(run) => {}
                }

                if !self.shared.is_current(run) {
                    break;
                }

                match self.wait_for_tick(run).await {
                    Wait::Tick => {}
                    Wait::Interrupted => break,
                    Wait::Cancelled => return,
                }
            }
        }
    }

    async fn wait_for_tick(&self, run: u64) -> Wait {
        let mut delay = self.shared.delay();
        let mut deadline = Instant::now() + delay;

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return Wait::Cancelled,
                _ = tokio::time::sleep_until(deadline) => return Wait::Tick,
                _ = self.shared.wake.notified() => {
                    if !self.shared.is_current(run) {
                        return Wait::Interrupted;
                    }
                    let current = self.shared.delay();
                    if current != delay {
                        delay = current;
                        deadline = Instant::now() + delay;
                        tracing::debug!("Next attempt re-armed in {:?}", delay);
                    }
                }
            }
        }
    }

    async fn attempt(&self, run: u64) {
        if !self.shared.is_current(run) {
            return;
        }

        let Some(snapshot) = self.capture().await else {
            tracing::debug!("No frame available, skipping");
            return;
        };
        let snapshot = self.recognition_input(snapshot).await;

        let previous = self
            .show_processing
            .then(|| self.text_tx.send_replace(PROCESSING_TEXT.to_string()));

        let outcome = self.engine.recognize(&snapshot).await;
        let text = match outcome {
            Ok(text) => {
                tracing::debug!("Recognized {} chars", text.len());
                text
            }
            Err(e) => {
                tracing::error!("OCR Error: {}", e);
                OCR_ERROR_TEXT.to_string()
            }
        };

        // Checked under the channel lock, see `SchedulerHandle::stop`
        let mut current_run = true;
        self.text_tx.send_if_modified(|current| {
            if self.shared.is_current(run) {
                *current = text;
                return true;
            }
            current_run = false;
            match previous {
                Some(previous) if current == PROCESSING_TEXT => {
                    *current = previous;
                    true
                }
                _ => false,
            }
        });
        if !current_run {
            tracing::debug!("Discarding result of a stopped run");
        }
    }

    /// Capture on the blocking pool; sources may touch the disk or a device
    async fn capture(&self) -> Option<Snapshot> {
        let capture = self.capture.clone();
        match tokio::task::spawn_blocking(move || capture.capture_snapshot()).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!("Capture task failed: {}", e);
                None
            }
        }
    }

    async fn recognition_input(&self, snapshot: Snapshot) -> Snapshot {
        let mirror = self.flip_policy == FlipPolicy::MirrorInput
            && self.shared.flipped.load(Ordering::SeqCst);
        if !mirror {
            return snapshot;
        }

        let frame = snapshot.clone();
        match tokio::task::spawn_blocking(move || frame.mirrored()).await {
            Ok(Ok(mirrored)) => mirrored,
            Ok(Err(e)) => {
                tracing::warn!("Failed to mirror frame, using it as captured: {}", e);
                snapshot
            }
            Err(e) => {
                tracing::error!("Mirror task failed: {}", e);
                snapshot
            }
        }
    }

    async fn teardown(mut self) {
        self.shared.run.fetch_and(!ACTIVE_BIT, Ordering::SeqCst);
        let capture = self.capture.clone();
        if let Err(e) = tokio::task::spawn_blocking(move || capture.release()).await {
            tracing::error!("Capture release failed: {}", e);
        }
        self.engine.shutdown().await;
        tracing::info!("Scheduler stopped, capture and engine released");
    }
}
