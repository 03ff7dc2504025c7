//! Camera capability interface.
//!
//! Device acquisition, lifecycle binding and preview presentation live behind
//! these traits; the pipeline only consumes frames and issues control calls.

use async_trait::async_trait;
use flume::{Receiver, Sender};

use crate::capture::frame::Frame;
use crate::error::ScanResult;

/// Opaque handle to the display surface the embedder presents preview frames
/// on. The pipeline never interprets it, only reports it back on start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceHandle(pub u64);

/// Camera device acquisition.
#[async_trait]
pub trait CameraCapability: Send + Sync {
    /// Acquire the device and start delivering analysis frames into `frames`.
    ///
    /// Fails with [`crate::ScannerError::CameraAcquisition`] when the device
    /// is unavailable; the pipeline then stays stopped.
    async fn acquire(&self, frames: Sender<Frame>) -> ScanResult<Box<dyn CameraHandle>>;
}

/// An acquired camera, alive until [`CameraHandle::release`].
pub trait CameraHandle: Send {
    /// Analysis resolution as reported by the sensor, before rotation.
    fn resolution(&self) -> (u32, u32);

    /// Physical sensor mounting rotation in degrees.
    fn sensor_rotation_degrees(&self) -> u32;

    fn has_flash(&self) -> bool;

    fn surface(&self) -> SurfaceHandle;

    fn set_torch(&self, enabled: bool) -> ScanResult<()>;

    /// Linear zoom, already validated to [0, 1] by the caller.
    fn set_zoom(&self, scale: f32) -> ScanResult<()>;

    /// Restore the default zoom ratio.
    fn reset_zoom(&self) -> ScanResult<()>;

    /// Torch on/off state changes.
    fn torch_events(&self) -> Receiver<bool>;

    /// Linear zoom scale changes.
    fn zoom_events(&self) -> Receiver<f32>;

    /// Release the device. Dropping the handle's frame sender closes the
    /// frame stream, which in turn terminates the pipeline's tick worker.
    fn release(self: Box<Self>);
}
