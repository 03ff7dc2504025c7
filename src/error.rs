//! Error types for scanner operations.

use thiserror::Error;

/// Result type for scanner operations.
pub type ScanResult<T> = Result<T, ScannerError>;

/// Errors surfaced by the detection pipeline.
#[derive(Debug, Error)]
pub enum ScannerError {
    #[error("scanner is already running")]
    AlreadyRunning,

    #[error("scanner is not running")]
    NotRunning,

    #[error("camera acquisition failed: {0}")]
    CameraAcquisition(String),

    /// Per-frame detection failure. Reported through the error callback,
    /// never fatal to the stream; only the static-image path returns it.
    #[error("detection failed: {0}")]
    Detection(String),

    #[error("zoom scale {0} is out of range (expected 0.0..=1.0)")]
    ZoomOutOfRange(f32),

    #[error("image decode failed: {0}")]
    ImageDecode(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScannerError {
    /// Create a detection failure error.
    pub fn detection(message: impl Into<String>) -> Self {
        Self::Detection(message.into())
    }

    /// Create a camera acquisition error.
    pub fn acquisition(message: impl Into<String>) -> Self {
        Self::CameraAcquisition(message.into())
    }
}
