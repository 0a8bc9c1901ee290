//! Testing utilities for CrabScan
//!
//! Synthetic NV21 frames, scripted detectors and a scripted camera device
//! for exercising sessions without hardware or ML models.

pub mod detectors;
pub mod device;
pub mod synthetic_data;

pub use detectors::{Behavior, Probe, RecordingSink, ScriptedDetector, SinkRecord};
pub use device::{CameraProbe, DeviceCall, ScriptedCamera};
pub use synthetic_data::{synthetic_nv21_frame, truncated_nv21_frame, PREVIEW_SIZES};

use std::time::{Duration, Instant};

/// Poll `condition` until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    condition()
}
