//! Synthetic test-pattern camera.
//!
//! Stands in for a real device in the demo binary and in tests: produces
//! gradient YUV 4:2:0 frames at a fixed rate and honors the full
//! [`CameraHandle`] surface.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use flume::{unbounded, Receiver, Sender};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::capture::camera::{CameraCapability, CameraHandle, SurfaceHandle};
use crate::capture::frame::{Frame, PixelRect, Plane};
use crate::error::{ScanResult, ScannerError};

/// A camera capability backed by a generated test pattern.
pub struct SyntheticCamera {
    width: u32,
    height: u32,
    fps: u32,
    frame_limit: Option<u64>,
    fail_acquire: bool,
}

impl SyntheticCamera {
    pub fn new(width: u32, height: u32, fps: u32) -> Self {
        Self {
            width,
            height,
            fps,
            frame_limit: None,
            fail_acquire: false,
        }
    }

    /// Stop producing after `limit` frames; the frame stream then closes.
    pub fn with_frame_limit(mut self, limit: u64) -> Self {
        self.frame_limit = Some(limit);
        self
    }

    /// A camera whose acquisition always fails, for error-path testing.
    pub fn failing() -> Self {
        Self {
            width: 0,
            height: 0,
            fps: 1,
            frame_limit: None,
            fail_acquire: true,
        }
    }
}

#[async_trait]
impl CameraCapability for SyntheticCamera {
    async fn acquire(&self, frames: Sender<Frame>) -> ScanResult<Box<dyn CameraHandle>> {
        if self.fail_acquire {
            return Err(ScannerError::acquisition("synthetic device unavailable"));
        }

        let (torch_tx, torch_rx) = unbounded();
        let (zoom_tx, zoom_rx) = unbounded();

        let width = self.width;
        let height = self.height;
        let interval = Duration::from_secs(1) / self.fps;
        let limit = self.frame_limit;

        let producer = tokio::spawn(async move {
            let mut sequence = 0u64;
            loop {
                if let Some(limit) = limit {
                    if sequence >= limit {
                        break;
                    }
                }
                let frame = test_pattern_frame(width, height, sequence);
                if frames.send_async(frame).await.is_err() {
                    break;
                }
                sequence += 1;
                tokio::time::sleep(interval).await;
            }
            debug!(sequence, "synthetic producer finished");
        });

        Ok(Box::new(SyntheticHandle {
            width,
            height,
            torch_tx,
            torch_rx,
            zoom_tx,
            zoom_rx,
            producer,
        }))
    }
}

struct SyntheticHandle {
    width: u32,
    height: u32,
    torch_tx: Sender<bool>,
    torch_rx: Receiver<bool>,
    zoom_tx: Sender<f32>,
    zoom_rx: Receiver<f32>,
    producer: JoinHandle<()>,
}

impl CameraHandle for SyntheticHandle {
    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn sensor_rotation_degrees(&self) -> u32 {
        // Mounted like a typical phone sensor: frames arrive transposed
        90
    }

    fn has_flash(&self) -> bool {
        true
    }

    fn surface(&self) -> SurfaceHandle {
        SurfaceHandle(1)
    }

    fn set_torch(&self, enabled: bool) -> ScanResult<()> {
        // The synthetic device confirms state changes immediately
        let _ = self.torch_tx.send(enabled);
        Ok(())
    }

    fn set_zoom(&self, scale: f32) -> ScanResult<()> {
        let _ = self.zoom_tx.send(scale);
        Ok(())
    }

    fn reset_zoom(&self) -> ScanResult<()> {
        let _ = self.zoom_tx.send(1.0);
        Ok(())
    }

    fn torch_events(&self) -> Receiver<bool> {
        self.torch_rx.clone()
    }

    fn zoom_events(&self) -> Receiver<f32> {
        self.zoom_rx.clone()
    }

    fn release(self: Box<Self>) {
        self.producer.abort();
    }
}

/// Horizontal luma gradient that brightens with the sequence number, neutral
/// chroma throughout.
pub fn test_pattern_frame(width: u32, height: u32, sequence: u64) -> Frame {
    let w = width as usize;
    let h = height as usize;

    let mut luma = vec![0u8; w * h];
    for row in 0..h {
        for col in 0..w {
            luma[row * w + col] = ((col as u64 * 255 / w as u64 + sequence * 8) % 256) as u8;
        }
    }
    let chroma = vec![128u8; (w / 2) * (h / 2)];

    Frame::new(
        width,
        height,
        90,
        PixelRect::new(0, 0, width as i32, height as i32),
        vec![
            Plane::new(Bytes::from(luma), w, 1),
            Plane::new(Bytes::from(chroma.clone()), w / 2, 1),
            Plane::new(Bytes::from(chroma), w / 2, 1),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_is_valid_yuv420() {
        let frame = test_pattern_frame(8, 4, 0);
        assert!(frame.has_image());
        assert_eq!(frame.planes[0].data.len(), 32);
        assert_eq!(frame.planes[1].data.len(), 8);
        assert_eq!(frame.planes[2].data.len(), 8);
    }

    #[tokio::test]
    async fn failing_camera_reports_acquisition_error() {
        let (tx, _rx) = flume::bounded(1);
        let err = SyntheticCamera::failing().acquire(tx).await.err().unwrap();
        assert!(matches!(err, ScannerError::CameraAcquisition(_)));
    }
}
