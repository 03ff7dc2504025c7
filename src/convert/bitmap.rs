//! NV21 to displayable bitmap encoding.

use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;

use crate::capture::frame::PixelRect;
use crate::error::ScanResult;

/// JPEG quality for returned images. Callers display or re-encode these, so
/// compression loss is kept minimal.
const JPEG_QUALITY: u8 = 100;

/// A compressed still image handed to the result callback.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    /// JPEG bytes.
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Convert an NV21 buffer to packed RGB using BT.601 coefficients.
///
/// Expects even dimensions, which 4:2:0 capture formats guarantee.
pub fn nv21_to_rgb(nv21: &[u8], width: u32, height: u32) -> Vec<u8> {
    let w = width as usize;
    let h = height as usize;
    let pixel_count = w * h;
    let mut rgb = Vec::with_capacity(pixel_count * 3);

    for row in 0..h {
        for col in 0..w {
            let y = nv21[row * w + col] as f32;
            // One V,U pair per 2x2 luma block
            let chroma = pixel_count + (row / 2) * w + (col / 2) * 2;
            let v = nv21[chroma] as f32 - 128.0;
            let u = nv21[chroma + 1] as f32 - 128.0;

            let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
            let g = (y - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8;
            let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;

            rgb.push(r);
            rgb.push(g);
            rgb.push(b);
        }
    }

    rgb
}

/// Encode packed RGB to JPEG.
pub fn rgb_to_jpeg(rgb: &[u8], width: u32, height: u32) -> ScanResult<Vec<u8>> {
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY).encode(
        rgb,
        width,
        height,
        ExtendedColorType::Rgb8,
    )?;
    Ok(out)
}

/// Convert an NV21 buffer straight to an [`EncodedImage`].
pub fn nv21_to_jpeg(nv21: &[u8], width: u32, height: u32) -> ScanResult<EncodedImage> {
    let rgb = nv21_to_rgb(nv21, width, height);
    let data = rgb_to_jpeg(&rgb, width, height)?;
    Ok(EncodedImage {
        data,
        width,
        height,
    })
}

/// Paint the given regions black, clamped to the image bounds. Used to redact
/// detected faces before the bitmap leaves the pipeline.
pub fn redact_regions(rgb: &mut [u8], width: u32, height: u32, regions: &[PixelRect]) {
    let w = width as i32;
    let h = height as i32;

    for region in regions {
        let left = region.left.clamp(0, w);
        let right = region.right.clamp(0, w);
        let top = region.top.clamp(0, h);
        let bottom = region.bottom.clamp(0, h);

        for row in top..bottom {
            let start = ((row * w + left) * 3) as usize;
            let end = ((row * w + right) * 3) as usize;
            rgb[start..end].fill(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 2x2 NV21 frame with uniform luma and neutral chroma.
    fn flat_nv21(luma: u8) -> Vec<u8> {
        vec![luma, luma, luma, luma, 128, 128]
    }

    #[test]
    fn neutral_chroma_maps_to_grayscale() {
        let rgb = nv21_to_rgb(&flat_nv21(255), 2, 2);
        assert_eq!(rgb.len(), 12);
        assert!(rgb.iter().all(|&c| c > 250));

        let rgb = nv21_to_rgb(&flat_nv21(0), 2, 2);
        assert!(rgb.iter().all(|&c| c < 5));
    }

    #[test]
    fn chroma_pairs_are_read_v_first() {
        // V=255 pushes red up; U=0 pushes blue down
        let nv21 = vec![128u8, 128, 128, 128, 255, 0];
        let rgb = nv21_to_rgb(&nv21, 2, 2);
        let (r, g, b) = (rgb[0], rgb[1], rgb[2]);
        assert!(r > 200, "expected strong red, got {r}");
        assert!(b < 50, "expected weak blue, got {b}");
        assert!(g < r);
    }

    #[test]
    fn jpeg_output_has_jfif_magic() {
        let image = nv21_to_jpeg(&flat_nv21(128), 2, 2).unwrap();
        assert_eq!(image.width, 2);
        assert_eq!(image.height, 2);
        assert_eq!(&image.data[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn redaction_blacks_out_clamped_region() {
        let mut rgb = vec![200u8; 4 * 4 * 3];
        redact_regions(&mut rgb, 4, 4, &[PixelRect::new(2, 2, 99, 99)]);

        // Pixel (0,0) untouched, pixel (3,3) blacked
        assert_eq!(&rgb[..3], &[200, 200, 200]);
        let last = (3 * 4 + 3) * 3;
        assert_eq!(&rgb[last..last + 3], &[0, 0, 0]);
        // Row 1 untouched entirely
        assert!(rgb[4 * 3..8 * 3].iter().all(|&c| c == 200));
    }
}
