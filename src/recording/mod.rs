//! Video recording state for a camera session
//!
//! Encoding happens inside the camera device; this module tracks the single
//! active recording and resolves its caller exactly once.
//!
//! # Example
//! ```rust
//! use crabscan::recording::{RecordOptions, RecordingController, RecordingRequest, RecordingState};
//!
//! let controller = RecordingController::new();
//! let (request, pending) = RecordingRequest::new(RecordOptions::default().with_path("/tmp/clip.mp4"));
//! controller.begin(request, |_| Ok(true));
//! assert_eq!(controller.state(), RecordingState::Recording);
//!
//! controller.on_video_recorded(Some("file:///tmp/clip.mp4".into()), 0, 0);
//! assert_eq!(pending.blocking_wait().unwrap().uri, "file:///tmp/clip.mp4");
//! ```

mod controller;
mod options;

pub use controller::{
    PendingRecording, RecordingController, RecordingOutcome, RecordingRequest, RecordingResolver, RecordingState,
};
pub use options::{RecordOptions, RecordingStarted, VideoQuality, VideoResult};
