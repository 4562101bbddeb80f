//! Deterministic collaborators for tests and the `mock` engine.
//!
//! Latencies use `tokio::time`, so tests running with paused time advance
//! through them instantly.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;

use crate::capture::CaptureSource;
use crate::engine::{OcrEngine, OcrError};
use crate::snapshot::Snapshot;

#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    Fail(String),
}

/// One `recognize` call as seen by the engine
#[derive(Debug, Clone, Copy)]
pub struct CallRecord {
    pub started: Instant,
    pub finished: Option<Instant>,
}

#[derive(Default)]
struct EngineStats {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: Mutex<Vec<CallRecord>>,
    last_input: Mutex<Option<Snapshot>>,
    initialized: AtomicBool,
    shut_down: AtomicBool,
}

/// Read-only view into a [`MockOcrEngine`] after it has been handed off
#[derive(Clone)]
pub struct EngineProbe(Arc<EngineStats>);

impl EngineProbe {
    pub fn calls(&self) -> usize {
        lock(&self.0.calls).len()
    }

    pub fn call_log(&self) -> Vec<CallRecord> {
        lock(&self.0.calls).clone()
    }

    /// Highest number of concurrent `recognize` calls observed
    pub fn max_in_flight(&self) -> usize {
        self.0.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn last_input(&self) -> Option<Snapshot> {
        lock(&self.0.last_input).clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.0.initialized.load(Ordering::SeqCst)
    }

    pub fn is_shut_down(&self) -> bool {
        self.0.shut_down.load(Ordering::SeqCst)
    }
}

pub struct MockOcrEngine {
    script: Mutex<VecDeque<MockReply>>,
    fallback: MockReply,
    latency: Duration,
    init_latency: Option<Duration>,
    init_failure: Option<String>,
    stats: Arc<EngineStats>,
}

impl MockOcrEngine {
    pub fn with_text(text: &str) -> Self {
        Self::replying(MockReply::Text(text.to_string()))
    }

    pub fn failing(message: &str) -> Self {
        Self::replying(MockReply::Fail(message.to_string()))
    }

    /// Replies in order, then repeats the last one
    pub fn scripted(replies: Vec<MockReply>) -> Self {
        let fallback = replies
            .last()
            .cloned()
            .unwrap_or_else(|| MockReply::Text(String::new()));
        let mut engine = Self::replying(fallback);
        engine.script = Mutex::new(replies.into());
        engine
    }

    fn replying(fallback: MockReply) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback,
            latency: Duration::ZERO,
            init_latency: Some(Duration::ZERO),
            init_failure: None,
            stats: Arc::new(EngineStats::default()),
        }
    }

    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn init_latency(mut self, latency: Duration) -> Self {
        self.init_latency = Some(latency);
        self
    }

    /// Initialization never completes
    pub fn init_hangs(mut self) -> Self {
        self.init_latency = None;
        self
    }

    pub fn init_failure(mut self, message: &str) -> Self {
        self.init_failure = Some(message.to_string());
        self
    }

    pub fn probe(&self) -> EngineProbe {
        EngineProbe(self.stats.clone())
    }
}

#[async_trait::async_trait]
impl OcrEngine for MockOcrEngine {
    fn name(&self) -> &str {
        "mock"
    }

    async fn initialize(&mut self) -> Result<(), OcrError> {
        match self.init_latency {
            Some(latency) => tokio::time::sleep(latency).await,
            None => std::future::pending::<()>().await,
        }

        if let Some(message) = &self.init_failure {
            return Err(OcrError::Backend(message.clone()));
        }

        self.stats.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn recognize(&self, snapshot: &Snapshot) -> Result<String, OcrError> {
        if !self.stats.initialized.load(Ordering::SeqCst) {
            return Err(OcrError::NotInitialized);
        }

        let index = {
            let mut calls = lock(&self.stats.calls);
            calls.push(CallRecord {
                started: Instant::now(),
                finished: None,
            });
            calls.len() - 1
        };
        *lock(&self.stats.last_input) = Some(snapshot.clone());

        let now = self.stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.max_in_flight.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.latency).await;

        self.stats.in_flight.fetch_sub(1, Ordering::SeqCst);
        lock(&self.stats.calls)[index].finished = Some(Instant::now());

        let reply = lock(&self.script)
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        match reply {
            MockReply::Text(text) => Ok(text),
            MockReply::Fail(message) => Err(OcrError::Backend(message)),
        }
    }

    async fn shutdown(&mut self) {
        self.stats.shut_down.store(true, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct CaptureStats {
    captures: AtomicUsize,
    absent: AtomicBool,
    released: AtomicBool,
}

/// Handle for steering a [`MockCaptureSource`] from a test
#[derive(Clone)]
pub struct CaptureProbe(Arc<CaptureStats>);

impl CaptureProbe {
    pub fn captures(&self) -> usize {
        self.0.captures.load(Ordering::SeqCst)
    }

    /// Simulate a camera that is not ready
    pub fn set_absent(&self, absent: bool) {
        self.0.absent.store(absent, Ordering::SeqCst);
    }

    pub fn is_released(&self) -> bool {
        self.0.released.load(Ordering::SeqCst)
    }
}

/// Always returns the same frame
pub struct MockCaptureSource {
    frame: Snapshot,
    stats: Arc<CaptureStats>,
}

impl MockCaptureSource {
    pub fn new(frame: Snapshot) -> Self {
        Self {
            frame,
            stats: Arc::new(CaptureStats::default()),
        }
    }

    /// A 2x1 frame, red on the left and blue on the right
    pub fn solid() -> Result<Self, crate::CaptureError> {
        Ok(Self::new(Snapshot::from_rgba(
            2,
            1,
            vec![255, 0, 0, 255, 0, 0, 255, 255],
        )?))
    }

    pub fn probe(&self) -> CaptureProbe {
        CaptureProbe(self.stats.clone())
    }
}

impl CaptureSource for MockCaptureSource {
    fn capture_snapshot(&self) -> Option<Snapshot> {
        self.stats.captures.fetch_add(1, Ordering::SeqCst);
        if self.stats.absent.load(Ordering::SeqCst) || self.stats.released.load(Ordering::SeqCst) {
            return None;
        }
        Some(self.frame.clone())
    }

    fn release(&self) {
        self.stats.released.store(true, Ordering::SeqCst);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn script_then_repeat_last() {
        let mut engine = MockOcrEngine::scripted(vec![
            MockReply::Text("one".into()),
            MockReply::Fail("boom".into()),
        ]);
        engine.initialize().await.unwrap();
        let frame = MockCaptureSource::solid().unwrap().capture_snapshot().unwrap();

        assert_eq!(engine.recognize(&frame).await.unwrap(), "one");
        assert!(engine.recognize(&frame).await.is_err());
        assert!(engine.recognize(&frame).await.is_err());
        assert_eq!(engine.probe().calls(), 3);
    }

    #[tokio::test]
    async fn refuses_before_initialize() {
        let engine = MockOcrEngine::with_text("x");
        let frame = MockCaptureSource::solid().unwrap().capture_snapshot().unwrap();
        assert!(matches!(
            engine.recognize(&frame).await,
            Err(OcrError::NotInitialized)
        ));
        assert_eq!(engine.probe().calls(), 0);
    }

    #[tokio::test]
    async fn init_failure_is_reported() {
        let mut engine = MockOcrEngine::with_text("x").init_failure("no model");
        assert!(engine.initialize().await.is_err());
        assert!(!engine.probe().is_initialized());
    }

    #[test]
    fn absent_capture_still_counts() {
        let source = MockCaptureSource::solid().unwrap();
        let probe = source.probe();
        probe.set_absent(true);
        assert!(source.capture_snapshot().is_none());
        assert_eq!(probe.captures(), 1);
    }
}
