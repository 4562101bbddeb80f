use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

use image::{ImageFormat, RgbaImage};

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("capture source '{0:?}' needs a path")]
    MissingPath(glimpse_types::CaptureKind),

    #[error("capture source '{0:?}' is not built in; rebuild with the `camera` feature")]
    NotCompiled(glimpse_types::CaptureKind),

    #[error("camera error: {0}")]
    Camera(String),

    #[error("unrecognized image data")]
    UnknownFormat,

    #[error("image codec error: {0}")]
    Image(#[from] image::ImageError),

    #[error("raw frame is {actual} bytes, expected {expected}")]
    FrameSize { expected: usize, actual: usize },
}

/// One encoded still frame.
///
/// Cloning is cheap, the encoded bytes are shared.
#[derive(Debug, Clone)]
pub struct Snapshot {
    data: Arc<[u8]>,
    format: ImageFormat,
}

impl Snapshot {
    /// Wrap already-encoded image bytes (PNG, JPEG)
    pub fn from_encoded(data: impl Into<Arc<[u8]>>) -> Result<Self, CaptureError> {
        let data = data.into();
        let format = image::guess_format(&data).map_err(|_| CaptureError::UnknownFormat)?;
        Ok(Self { data, format })
    }

    /// Encode a raw RGBA frame as PNG
    pub fn from_rgba(width: u32, height: u32, raw: Vec<u8>) -> Result<Self, CaptureError> {
        let expected = width as usize * height as usize * 4;
        let actual = raw.len();
        let image = RgbaImage::from_raw(width, height, raw)
            .ok_or(CaptureError::FrameSize { expected, actual })?;
        encode_png(&image)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.to_mime_type()
    }

    /// Horizontally mirrored copy, re-encoded as PNG
    pub fn mirrored(&self) -> Result<Self, CaptureError> {
        let image = image::load_from_memory_with_format(&self.data, self.format)?;
        encode_png(&image::imageops::flip_horizontal(&image.to_rgba8()))
    }
}

fn encode_png(image: &RgbaImage) -> Result<Snapshot, CaptureError> {
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageFormat::Png)?;
    Ok(Snapshot {
        data: buffer.into_inner().into(),
        format: ImageFormat::Png,
    })
}
