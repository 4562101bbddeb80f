//! Video device capture through OpenCV.
//!
//! A dedicated thread reads frames continuously and publishes the latest one,
//! JPEG-encoded, into a [`FrameSlot`]. The scheduler only ever sees the slot.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use opencv::core::{Mat, Vector};
use opencv::imgcodecs;
use opencv::prelude::*;
use opencv::videoio::{self, VideoCapture};

use crate::capture::{CaptureSource, FrameSlot};
use crate::snapshot::{CaptureError, Snapshot};

pub struct CameraSource {
    slot: Arc<FrameSlot>,
    stop: Arc<AtomicBool>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl CameraSource {
    /// Open device `device` and start reading a frame every `interval`
    pub fn open(device: i32, interval: Duration) -> Result<Self, CaptureError> {
        let mut camera = VideoCapture::new(device, videoio::CAP_ANY).map_err(camera_error)?;
        if !camera.is_opened().map_err(camera_error)? {
            return Err(CaptureError::Camera(format!("unable to open device {device}")));
        }
        tracing::info!("Camera {} opened", device);

        let slot = Arc::new(FrameSlot::new());
        let stop = Arc::new(AtomicBool::new(false));

        let reader = std::thread::Builder::new()
            .name("camera-reader".into())
            .spawn({
                let slot = slot.clone();
                let stop = stop.clone();
                move || {
                    read_loop(&mut camera, &slot, &stop, interval);
                    if let Err(e) = camera.release() {
                        tracing::warn!("Failed to release camera: {}", e);
                    }
                    tracing::debug!("camera reader stopping");
                }
            })
            .map_err(|e| CaptureError::Camera(format!("failed to start reader thread: {e}")))?;

        Ok(Self {
            slot,
            stop,
            reader: Mutex::new(Some(reader)),
        })
    }
}

impl CaptureSource for CameraSource {
    fn capture_snapshot(&self) -> Option<Snapshot> {
        self.slot.capture_snapshot()
    }

    fn release(&self) {
        self.stop.store(true, Ordering::SeqCst);
        let reader = match self.reader.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(reader) = reader {
            if reader.join().is_err() {
                tracing::error!("camera reader panicked");
            }
        }
        self.slot.release();
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

fn read_loop(camera: &mut VideoCapture, slot: &FrameSlot, stop: &AtomicBool, interval: Duration) {
    let mut frame = Mat::default();

    while !stop.load(Ordering::SeqCst) {
        match camera.read(&mut frame) {
            Ok(true) if !frame.empty() => match encode_frame(&frame) {
                Ok(snapshot) => slot.publish(snapshot),
                Err(e) => tracing::debug!("Dropping frame: {}", e),
            },
            Ok(_) => tracing::debug!("Camera returned an empty frame"),
            Err(e) => tracing::warn!("Camera read failed: {}", e),
        }
        std::thread::sleep(interval);
    }
}

fn encode_frame(frame: &Mat) -> Result<Snapshot, CaptureError> {
    let mut buffer = Vector::<u8>::new();
    if !imgcodecs::imencode(".jpg", frame, &mut buffer, &Vector::new()).map_err(camera_error)? {
        return Err(CaptureError::Camera("frame could not be encoded".into()));
    }
    Snapshot::from_encoded(buffer.to_vec())
}

fn camera_error(e: opencv::Error) -> CaptureError {
    CaptureError::Camera(e.to_string())
}
