//! Synthetic preview frames
//!
//! Deterministic NV21 buffers for exercising dispatch without a camera.

use crate::types::Frame;

/// Create an NV21 frame with a moving luma gradient and neutral chroma
pub fn synthetic_nv21_frame(frame_number: u64, width: u32, height: u32) -> Frame {
    let mut data = vec![128u8; Frame::min_nv21_len(width, height)];

    let base = (frame_number % 256) as u8;
    for y in 0..height {
        for x in 0..width {
            let idx = (y * width + x) as usize;
            data[idx] = base.wrapping_add(((x + y) % 256) as u8);
        }
    }

    Frame::new(data, width, height, 0)
}

/// A frame one byte short of the NV21 lower bound
pub fn truncated_nv21_frame(width: u32, height: u32) -> Frame {
    let len = Frame::min_nv21_len(width, height).saturating_sub(1);
    Frame::new(vec![0u8; len], width, height, 0)
}

/// Preview sizes commonly negotiated by phone cameras
pub const PREVIEW_SIZES: &[(u32, u32)] = &[(640, 480), (1280, 720), (1920, 1080)];
