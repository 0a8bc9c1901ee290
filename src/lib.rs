//! CrabScan: per-frame analysis scheduling and still-capture correlation for
//! live camera previews
//!
//! A camera delivers preview frames at a fixed rate. CrabScan decides on each
//! frame which of up to seven analysis kinds (barcode scanning, ML barcode,
//! face, text, label, object and pose detection) may run, runs them off the
//! capture thread and never lets one kind overlap itself. Still captures
//! are correlated with the pictures the camera delivers, strictly in request
//! order, and each caller is resolved exactly once.
//!
//! # Features
//! - Lock-free per-kind admission gates, released on every exit path
//! - Detector panics become ordinary failures
//! - FIFO capture queue with fast-mode early resolution
//! - Single-recording state with host-pause interruption
//! - Dedicated camera worker thread with scoped device release
//!
//! # Usage
//! ```rust,no_run
//! use crabscan::analysis::{DetectorSet, FnDetector};
//! use crabscan::testing::{synthetic_nv21_frame, ScriptedCamera};
//! use crabscan::{AnalysisKind, CameraSession, DetectionResult};
//!
//! let (camera, _probe) = ScriptedCamera::new();
//! let detectors = DetectorSet::new().with(
//!     AnalysisKind::Face,
//!     FnDetector::new(|frame, _params| Ok(DetectionResult::empty(frame))),
//! );
//! let session = CameraSession::builder(camera).detectors(detectors).build()?;
//! session.set_analysis_enabled(AnalysisKind::Face, true);
//! session.on_host_resume();
//! session.on_frame(synthetic_nv21_frame(0, 640, 480));
//! # Ok::<(), crabscan::CameraError>(())
//! ```
pub mod analysis;
pub mod camera;
pub mod capture;
pub mod config;
pub mod errors;
pub mod events;
pub mod image_utils;
pub mod invariant_ppt;
pub mod layout;
pub mod recording;
pub mod session;
pub mod types;

// Testing utilities - synthetic frames and scripted collaborators
pub mod testing;

// Re-exports for convenience
pub use analysis::{Detector, DetectorSet, FeatureFlags, InversionMode, ResultSink};
pub use camera::{select_preview_fps_range, CameraDevice, FpsRange};
pub use capture::{CaptureOptions, PendingCapture, PictureResult};
pub use config::ScanConfig;
pub use errors::{CameraError, CaptureError, DetectorError, RecordingError};
pub use events::{CameraEvent, ChannelEmitter, EventEmitter};
pub use recording::{RecordOptions, RecordingState, VideoResult};
pub use session::{CameraSession, SessionBuilder};
pub use types::{AnalysisKind, Detection, DetectionResult, Frame, KindSet};

/// Initialize logging for the scanning system
pub fn init_logging() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "crabscan=info");
    }
    let _ = env_logger::try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get crate information
pub fn get_info() -> CrateInfo {
    CrateInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
        analysis_kinds: AnalysisKind::all().collect(),
    }
}

/// Crate information structure
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CrateInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub analysis_kinds: Vec<AnalysisKind>,
}
