pub mod capture;
pub mod convert;
pub mod detect;
pub mod error;
pub mod pipeline;

use serde::{Deserialize, Serialize};

pub use capture::camera::{CameraCapability, CameraHandle, SurfaceHandle};
pub use capture::frame::{Frame, PixelRect, Plane};
pub use convert::EncodedImage;
pub use detect::{DetectedObject, DetectorCapability, FaceDetectorCapability, Symbology};
pub use error::{ScanResult, ScannerError};
pub use pipeline::governor::DetectionSpeed;
pub use pipeline::window::ScanWindow;
pub use pipeline::{Scanner, ScannerCallbacks, StartParameters};

/// Scanner configuration, fixed for one start/stop cycle. Changing any field
/// requires a stop and a fresh start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    pub detection_speed: DetectionSpeed,
    /// Throttle interval for [`DetectionSpeed::ThrottledByTimer`], in
    /// milliseconds.
    pub detection_timeout_ms: u64,
    /// Attach the converted JPEG to each emitted result.
    pub return_image: bool,
    /// Black out detected faces in the returned image. Needs a face detector
    /// attached to the scanner.
    pub redact_faces: bool,
    pub torch_on_start: bool,
    /// Restrict reported detections to this normalized window.
    pub scan_window: Option<ScanWindow>,
    /// Bounded depth of the camera-to-worker frame queue.
    pub frame_queue_depth: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            detection_speed: DetectionSpeed::SuppressDuplicates,
            detection_timeout_ms: 250,
            return_image: false,
            redact_faces: false,
            torch_on_start: false,
            scan_window: None,
            frame_queue_depth: 4,
        }
    }
}
