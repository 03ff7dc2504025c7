//! Scan-window geometry.
//!
//! A scan window restricts which detections are reported to a sub-rectangle
//! of the sensor frame, given in normalized coordinates.

use serde::{Deserialize, Serialize};

use crate::capture::frame::PixelRect;

/// Normalized sub-rectangle of the frame, each coordinate in [0, 1] relative
/// to the sensor dimensions before rotation.
///
/// A window whose coordinates are not monotonic (`left >= right` or
/// `top >= bottom`) scales to an empty rectangle, which contains nothing:
/// every detection is silently filtered out. That matches the long-standing
/// behavior callers rely on, so it is not reported as an error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScanWindow {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl ScanWindow {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Scale the window into sensor pixel space.
    ///
    /// The horizontal axis is scaled by the frame's reported *height* and the
    /// vertical axis by its *width*: analysis frames arrive rotated 90
    /// degrees relative to display orientation, and the window is expressed
    /// in display terms. Preserve this swap; detectors report boxes in the
    /// same space.
    pub fn to_pixel_rect(&self, frame_width: u32, frame_height: u32) -> PixelRect {
        let image_width = frame_height as f32;
        let image_height = frame_width as f32;

        PixelRect::new(
            (self.left * image_width).round() as i32,
            (self.top * image_height).round() as i32,
            (self.right * image_width).round() as i32,
            (self.bottom * image_height).round() as i32,
        )
    }

    /// True when `bounds` is fully contained in the scaled window. Objects
    /// without a bounding box are dropped while a window is active.
    pub fn contains(&self, bounds: Option<PixelRect>, frame_width: u32, frame_height: u32) -> bool {
        let Some(bounds) = bounds else {
            return false;
        };
        self.to_pixel_rect(frame_width, frame_height).contains(&bounds)
    }
}
