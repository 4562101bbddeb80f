use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::SystemTime;

use glimpse_config::capture::CaptureConfig;
use glimpse_types::CaptureKind;

use crate::mock::MockCaptureSource;
use crate::snapshot::{CaptureError, Snapshot};

/// Source of still frames for recognition
pub trait CaptureSource: Send + Sync {
    /// Most recent available frame, `None` if the device is not ready.
    ///
    /// May block on disk or device access; the scheduler calls it on the
    /// blocking pool.
    fn capture_snapshot(&self) -> Option<Snapshot>;

    /// Release the underlying device
    fn release(&self) {}
}

/// Latest-frame slot, written by a capture thread and read by the scheduler
#[derive(Default)]
pub struct FrameSlot {
    latest: RwLock<Option<Snapshot>>,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current frame
    pub fn publish(&self, snapshot: Snapshot) {
        match self.latest.write() {
            Ok(mut guard) => *guard = Some(snapshot),
            Err(poisoned) => *poisoned.into_inner() = Some(snapshot),
        }
    }

    pub fn clear(&self) {
        match self.latest.write() {
            Ok(mut guard) => *guard = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
    }
}

impl CaptureSource for FrameSlot {
    fn capture_snapshot(&self) -> Option<Snapshot> {
        match self.latest.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn release(&self) {
        self.clear();
    }
}

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Newest image file in a directory a camera pipeline writes frames to
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, CaptureError> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(CaptureError::Io {
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
                path: dir,
            });
        }
        Ok(Self { dir })
    }

    fn newest_frame(&self) -> Option<PathBuf> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Failed to list {}: {}", self.dir.display(), e);
                return None;
            }
        };

        entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| is_image_file(path))
            .filter_map(|path| {
                let modified = fs::metadata(&path).and_then(|m| m.modified()).ok()?;
                Some((modified, path))
            })
            .max_by_key(|(modified, _): &(SystemTime, PathBuf)| *modified)
            .map(|(_, path)| path)
    }
}

impl CaptureSource for DirectorySource {
    fn capture_snapshot(&self) -> Option<Snapshot> {
        let path = self.newest_frame()?;
        // The writer may be mid-frame; treat unreadable frames as not ready
        match read_snapshot(&path) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::debug!("Skipping frame {}: {}", path.display(), e);
                None
            }
        }
    }
}

/// A single image file loaded once
pub struct StillImageSource {
    slot: FrameSlot,
}

impl StillImageSource {
    pub fn open(path: &Path) -> Result<Self, CaptureError> {
        let slot = FrameSlot::new();
        slot.publish(read_snapshot(path)?);
        Ok(Self { slot })
    }
}

impl CaptureSource for StillImageSource {
    fn capture_snapshot(&self) -> Option<Snapshot> {
        self.slot.capture_snapshot()
    }

    fn release(&self) {
        self.slot.release();
    }
}

/// Construct the source selected in config
pub fn build_capture(config: &CaptureConfig) -> Result<Box<dyn CaptureSource>, CaptureError> {
    let path = || config.path.clone().ok_or(CaptureError::MissingPath(config.source));
    match config.source {
        CaptureKind::Directory => Ok(Box::new(DirectorySource::new(path()?)?)),
        CaptureKind::Still => Ok(Box::new(StillImageSource::open(&path()?)?)),
        #[cfg(feature = "camera")]
        CaptureKind::Camera => Ok(Box::new(crate::camera::CameraSource::open(
            config.device,
            config.frame_interval(),
        )?)),
        #[cfg(not(feature = "camera"))]
        CaptureKind::Camera => Err(CaptureError::NotCompiled(CaptureKind::Camera)),
        CaptureKind::Mock => Ok(Box::new(MockCaptureSource::solid()?)),
    }
}

fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn read_snapshot(path: &Path) -> Result<Snapshot, CaptureError> {
    let data = fs::read(path).map_err(|source| CaptureError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Snapshot::from_encoded(data)
}
