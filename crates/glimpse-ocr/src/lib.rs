#[cfg(feature = "camera")]
mod camera;
mod capture;
mod engine;
mod http;
pub mod mock;
mod snapshot;
mod tesseract;

#[cfg(feature = "camera")]
pub use camera::CameraSource;
pub use capture::{CaptureSource, DirectorySource, FrameSlot, StillImageSource, build_capture};
pub use engine::{OcrEngine, OcrError, build_engine};
pub use http::HttpModelEngine;
pub use snapshot::{CaptureError, Snapshot};
pub use tesseract::TesseractEngine;
