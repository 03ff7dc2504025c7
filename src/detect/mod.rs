//! Detector capability interface and result types.
//!
//! The barcode and face detection models are external collaborators; the
//! pipeline submits images and consumes their results.

use async_trait::async_trait;
use thiserror::Error;

use crate::capture::frame::{Frame, PixelRect};

/// Per-call detection failure. Non-fatal: the pipeline reports it through the
/// error callback and keeps processing frames.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct DetectorError(pub String);

/// Result type for detector invocations.
pub type DetectorResult<T> = Result<T, DetectorError>;

/// Barcode symbology of a decoded result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbology {
    QrCode,
    Ean13,
    Ean8,
    Code39,
    Code128,
    DataMatrix,
    Pdf417,
    Aztec,
    Unknown,
}

/// A decoded detection result. Immutable once produced.
#[derive(Debug, Clone)]
pub struct DetectedObject {
    /// Raw decoded payload; absent for partially decoded results.
    pub raw_value: Option<String>,
    /// Human-readable rendering of the payload.
    pub display_value: Option<String>,
    pub symbology: Symbology,
    /// Bounding box in sensor pixel space; absent when the detector could not
    /// locate the object precisely.
    pub bounding_box: Option<PixelRect>,
}

impl DetectedObject {
    pub fn new(raw_value: impl Into<String>) -> Self {
        let raw = raw_value.into();
        Self {
            display_value: Some(raw.clone()),
            raw_value: Some(raw),
            symbology: Symbology::Unknown,
            bounding_box: None,
        }
    }

    pub fn with_bounding_box(mut self, bounds: PixelRect) -> Self {
        self.bounding_box = Some(bounds);
        self
    }

    pub fn with_symbology(mut self, symbology: Symbology) -> Self {
        self.symbology = symbology;
        self
    }
}

/// Input handed to a detector: either a live YUV analysis frame or a decoded
/// bitmap from the static-image path.
pub enum DetectorImage<'a> {
    YuvFrame(&'a Frame),
    Bitmap(&'a image::DynamicImage),
}

/// Barcode decoding model.
#[async_trait]
pub trait DetectorCapability: Send + Sync {
    async fn process(&self, image: DetectorImage<'_>) -> DetectorResult<Vec<DetectedObject>>;
}

/// Face detection model, used only by the image redaction side path.
#[async_trait]
pub trait FaceDetectorCapability: Send + Sync {
    async fn process(&self, image: DetectorImage<'_>) -> DetectorResult<Vec<PixelRect>>;
}
