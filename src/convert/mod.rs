pub mod bitmap;
pub mod nv21;

pub use bitmap::{nv21_to_jpeg, nv21_to_rgb, redact_regions, rgb_to_jpeg, EncodedImage};
pub use nv21::frame_to_nv21;
