//! The camera device collaborator and preview parameter helpers.

use crate::capture::CaptureOptions;
use crate::errors::CameraError;
use crate::recording::RecordOptions;
use serde::{Deserialize, Serialize};

/// A camera that delivers preview frames and still pictures back into a
/// session.
///
/// Implementations report asynchronously through the session's callbacks
/// (`on_frame`, `on_picture_taken`, `on_video_recorded`, ...). All methods are
/// called from the session's camera worker thread.
pub trait CameraDevice: Send {
    fn start(&mut self) -> Result<(), CameraError>;
    fn stop(&mut self);
    fn is_opened(&self) -> bool;

    /// Begin a still capture. The picture arrives later via
    /// `on_picture_taken`, in request order.
    fn take_picture(&mut self, options: &CaptureOptions) -> Result<(), CameraError>;

    /// Returns whether the device accepted the recording.
    fn record(&mut self, options: &RecordOptions) -> Result<bool, CameraError>;
    fn stop_recording(&mut self);

    /// Whether any analysis kind wants preview frames.
    fn set_scanning(&mut self, scanning: bool);
}

/// Supported preview frame rate range, in frames per second x 1000.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FpsRange {
    pub min: u32,
    pub max: u32,
}

impl FpsRange {
    pub fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }
}

const TARGET_FPS_X1000: i64 = 30_000;

/// The range closest to a steady 30 fps: smallest
/// `|30000 - min| + |30000 - max|`, first one on ties.
pub fn select_preview_fps_range(ranges: &[FpsRange]) -> Option<FpsRange> {
    let distance = |r: &FpsRange| (TARGET_FPS_X1000 - r.min as i64).abs() + (TARGET_FPS_X1000 - r.max as i64).abs();
    let mut best: Option<(i64, FpsRange)> = None;
    for range in ranges {
        let d = distance(range);
        if best.map_or(true, |(best_d, _)| d < best_d) {
            best = Some((d, *range));
        }
    }
    best.map(|(_, range)| range)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefers_fixed_30() {
        let ranges = [
            FpsRange::new(15_000, 15_000),
            FpsRange::new(7_000, 30_000),
            FpsRange::new(30_000, 30_000),
            FpsRange::new(24_000, 60_000),
        ];
        assert_eq!(select_preview_fps_range(&ranges), Some(FpsRange::new(30_000, 30_000)));
    }

    #[test]
    fn test_first_wins_on_tie() {
        let ranges = [FpsRange::new(25_000, 35_000), FpsRange::new(20_000, 30_000)];
        assert_eq!(select_preview_fps_range(&ranges), Some(FpsRange::new(25_000, 35_000)));
    }

    #[test]
    fn test_empty_is_none() {
        assert_eq!(select_preview_fps_range(&[]), None);
    }
}
