//! Recording option and result types

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Quality presets for video recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoQuality {
    /// 480p
    Low,
    /// 720p
    Medium,
    /// 1080p
    #[default]
    High,
    /// 2160p
    Uhd,
}

impl VideoQuality {
    /// Recommended bitrate in bits per second
    pub fn bitrate(&self) -> u32 {
        match self {
            VideoQuality::Low => 1_500_000,
            VideoQuality::Medium => 5_000_000,
            VideoQuality::High => 10_000_000,
            VideoQuality::Uhd => 35_000_000,
        }
    }

    /// Frame size (width, height) in landscape
    pub fn resolution(&self) -> (u32, u32) {
        match self {
            VideoQuality::Low => (720, 480),
            VideoQuality::Medium => (1280, 720),
            VideoQuality::High => (1920, 1080),
            VideoQuality::Uhd => (3840, 2160),
        }
    }
}

/// Options for one `record` call
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordOptions {
    /// Output file; defaults to `<destination>/<uuid>.mp4`
    pub path: Option<PathBuf>,
    pub quality: VideoQuality,
    /// Stop after this many seconds
    pub max_duration: Option<f64>,
    /// Stop once the file reaches this many bytes
    pub max_file_size: Option<u64>,
    pub fps: Option<u32>,
    /// Overrides the quality preset's bitrate
    pub video_bitrate: Option<u32>,
    pub mute: bool,
    /// Forced orientation in degrees
    pub orientation: Option<i32>,
}

impl RecordOptions {
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_max_duration(mut self, secs: f64) -> Self {
        self.max_duration = Some(secs);
        self
    }

    pub fn muted(mut self) -> Self {
        self.mute = true;
        self
    }

    /// Fill in the output path if the caller did not choose one.
    pub fn resolve_path(&mut self, destination: &Path) -> &Path {
        self.path
            .get_or_insert_with(|| destination.join(format!("{}.mp4", uuid::Uuid::new_v4())))
    }

    pub fn effective_bitrate(&self) -> u32 {
        self.video_bitrate.unwrap_or_else(|| self.quality.bitrate())
    }
}

/// Resolution of a finished recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoResult {
    pub uri: String,
    /// The host was paused while recording
    pub is_recording_interrupted: bool,
    pub video_orientation: i32,
    pub device_orientation: i32,
}

/// Payload of the recording-start event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingStarted {
    pub uri: String,
    pub video_orientation: i32,
    pub device_orientation: i32,
}
