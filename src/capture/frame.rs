use bytes::Bytes;

/// Axis-aligned rectangle in sensor pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl PixelRect {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    /// True if all four sides of `other` lie inside or on this rectangle.
    /// An empty rectangle (left >= right or top >= bottom) contains nothing.
    pub fn contains(&self, other: &PixelRect) -> bool {
        self.left < self.right
            && self.top < self.bottom
            && self.left <= other.left
            && self.top <= other.top
            && self.right >= other.right
            && self.bottom >= other.bottom
    }
}

/// One plane of a multi-plane pixel buffer.
///
/// `row_stride` is the byte distance between row starts and may exceed the
/// logical row width; `pixel_stride` is the byte distance between consecutive
/// samples and exceeds 1 when the source interleaves other channel data
/// between samples.
#[derive(Debug, Clone)]
pub struct Plane {
    /// Immutable plane data - can be shared across threads without copying
    pub data: Bytes,
    pub row_stride: usize,
    pub pixel_stride: usize,
}

impl Plane {
    pub fn new(data: Bytes, row_stride: usize, pixel_stride: usize) -> Self {
        Self {
            data,
            row_stride,
            pixel_stride,
        }
    }
}

/// A raw analysis frame handed to the pipeline by the camera capability.
///
/// Pixel format is fixed: three-plane YUV 4:2:0 (full-resolution luma plus
/// two quarter-resolution chroma planes). The pipeline owns the frame for
/// exactly one tick. The underlying capture buffer is returned to the camera
/// when the release hook runs; that happens exactly once, either through an
/// explicit [`Frame::release`] or when the frame is dropped, whichever comes
/// first.
pub struct Frame {
    pub width: u32,
    pub height: u32,
    /// Clockwise rotation needed to upright the image, in degrees.
    pub rotation_degrees: u32,
    /// Valid region of the luma plane; chroma crops are derived by halving.
    pub crop: PixelRect,
    /// Y, U, V plane descriptors. May be empty transiently while the camera
    /// reconfigures; such frames are skipped, not errors.
    pub planes: Vec<Plane>,
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Frame {
    pub fn new(
        width: u32,
        height: u32,
        rotation_degrees: u32,
        crop: PixelRect,
        planes: Vec<Plane>,
    ) -> Self {
        Self {
            width,
            height,
            rotation_degrees,
            crop,
            planes,
            release: None,
        }
    }

    /// Attach the hook that returns the capture buffer to the camera's pool.
    pub fn with_release_hook(mut self, hook: impl FnOnce() + Send + Sync + 'static) -> Self {
        self.release = Some(Box::new(hook));
        self
    }

    /// True when the frame carries usable image data.
    pub fn has_image(&self) -> bool {
        self.planes.len() == 3 && self.planes.iter().all(|p| !p.data.is_empty())
    }

    /// Release the underlying capture buffer now instead of at drop time.
    pub fn release(mut self) {
        if let Some(hook) = self.release.take() {
            hook();
        }
    }
}

impl Drop for Frame {
    fn drop(&mut self) {
        if let Some(hook) = self.release.take() {
            hook();
        }
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("rotation_degrees", &self.rotation_degrees)
            .field("crop", &self.crop)
            .field("planes", &self.planes.len())
            .finish()
    }
}
