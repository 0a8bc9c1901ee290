//! NV21 helpers for attaching the analysed frame to barcode events.

use crate::types::Frame;
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;

/// Convert an NV21 frame (Y plane followed by interleaved V/U at half
/// resolution) to packed RGB using BT.601 integer coefficients.
pub fn nv21_to_rgb(frame: &Frame) -> Option<RgbImage> {
    if !frame.is_valid() || frame.width == 0 || frame.height == 0 {
        return None;
    }

    let width = frame.width as usize;
    let height = frame.height as usize;
    let data = &frame.data[..];
    let y_len = width * height;
    let uv_stride = width + (width & 1);

    let mut rgb = Vec::with_capacity(y_len * 3);
    for row in 0..height {
        let uv_row = y_len + (row / 2) * uv_stride;
        for col in 0..width {
            let y = data[row * width + col] as i32;
            let uv = uv_row + (col / 2) * 2;
            let v = data.get(uv).copied().unwrap_or(128) as i32 - 128;
            let u = data.get(uv + 1).copied().unwrap_or(128) as i32 - 128;

            let r = y + ((359 * v) >> 8);
            let g = y - ((88 * u + 183 * v) >> 8);
            let b = y + ((454 * u) >> 8);

            rgb.push(r.clamp(0, 255) as u8);
            rgb.push(g.clamp(0, 255) as u8);
            rgb.push(b.clamp(0, 255) as u8);
        }
    }

    RgbImage::from_raw(frame.width, frame.height, rgb)
}

/// JPEG rendering of an NV21 frame.
pub fn nv21_to_jpeg(frame: &Frame, quality: u8) -> Result<Vec<u8>, String> {
    let rgb = nv21_to_rgb(frame).ok_or_else(|| {
        format!(
            "Error decoding imageData from NV21 format ({} bytes)",
            frame.data.len()
        )
    })?;

    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100))
        .encode_image(&rgb)
        .map_err(|e| format!("JPEG encode failed: {}", e))?;
    Ok(buffer)
}
