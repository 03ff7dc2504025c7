//! Planar YUV 4:2:0 to interleaved NV21 conversion.
//!
//! Camera analysis frames arrive as three independently strided planes; the
//! bitmap encoder wants a single contiguous semi-planar buffer: the Y plane
//! followed by interleaved V/U sample pairs.

use std::time::Instant;

use crate::capture::frame::{Frame, PixelRect, Plane};

/// Convert a three-plane 4:2:0 frame into a fresh NV21 buffer of exactly
/// `crop_width * crop_height * 3 / 2` bytes.
///
/// The buffer is rebuilt per call and must not be cached: the source plane
/// memory is invalidated when the frame is released.
pub fn frame_to_nv21(frame: &Frame) -> Vec<u8> {
    let start = Instant::now();

    let crop = frame.crop;
    let pixel_count = (crop.width() as usize) * (crop.height() as usize);
    // 12 bits per pixel in 4:2:0
    let mut out = vec![0u8; pixel_count * 12 / 8];

    for (plane_index, plane) in frame.planes.iter().enumerate().take(3) {
        write_plane(plane_index, plane, crop, pixel_count, &mut out);
    }

    metrics::histogram!("nv21_convert_us").record(start.elapsed().as_micros() as f64);
    out
}

fn write_plane(
    plane_index: usize,
    plane: &Plane,
    luma_crop: PixelRect,
    pixel_count: usize,
    out: &mut [u8],
) {
    // Output stride and starting offset are fixed by plane role. Luma writes
    // one byte per pixel from offset 0. The chroma planes interleave after the
    // luma block: in NV21 the U samples sit at odd indices, V at even.
    let (output_stride, mut output_offset) = match plane_index {
        0 => (1usize, 0usize),
        1 => (2, pixel_count + 1),
        2 => (2, pixel_count),
        _ => return,
    };

    // Chroma planes cover 2x2 blocks, so their crop is the luma crop halved
    let crop = if plane_index == 0 {
        luma_crop
    } else {
        PixelRect::new(
            luma_crop.left / 2,
            luma_crop.top / 2,
            luma_crop.right / 2,
            luma_crop.bottom / 2,
        )
    };

    let plane_width = crop.width() as usize;
    let plane_height = crop.height() as usize;
    if plane_width == 0 || plane_height == 0 {
        return;
    }

    let pixel_stride = plane.pixel_stride;
    let fast_path = pixel_stride == 1 && output_stride == 1;

    // Rows stop at the last meaningful sample: the source pixel stride may
    // interleave unrelated bytes between samples, but never after the last
    // one in a row.
    let row_length = if fast_path {
        plane_width
    } else {
        (plane_width - 1) * pixel_stride + 1
    };

    let data = plane.data.as_ref();
    for row in 0..plane_height {
        let row_start = (row + crop.top as usize) * plane.row_stride
            + (crop.left as usize) * pixel_stride;
        let row_bytes = &data[row_start..row_start + row_length];

        if fast_path {
            out[output_offset..output_offset + row_length].copy_from_slice(row_bytes);
            output_offset += row_length;
        } else {
            for col in 0..plane_width {
                out[output_offset] = row_bytes[col * pixel_stride];
                output_offset += output_stride;
            }
        }
    }
}
