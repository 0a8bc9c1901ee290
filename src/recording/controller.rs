use super::options::{RecordOptions, VideoResult};
use crate::assert_invariant;
use crate::errors::{CameraError, RecordingError};
use crate::invariant_ppt::invariants;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tokio::sync::oneshot;

/// State of the single video recording a session may have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingState {
    #[default]
    Idle,
    Recording,
    /// The host paused while recording; the recording still resolves once.
    RecordingInterrupted,
}

pub type RecordingOutcome = Result<VideoResult, RecordingError>;

/// Sending half of a recording's resolution. Dropping it unresolved
/// rejects the caller with `Cancelled`.
#[derive(Debug)]
pub struct RecordingResolver {
    sender: Option<oneshot::Sender<RecordingOutcome>>,
}

impl RecordingResolver {
    pub fn resolve(mut self, outcome: RecordingOutcome) {
        let sender = self.sender.take();
        assert_invariant!(
            sender.is_some(),
            invariants::RECORDING_RESOLVED_ONCE,
            "recording::controller"
        );
        if let Some(sender) = sender {
            let _ = sender.send(outcome);
        }
    }
}

impl Drop for RecordingResolver {
    fn drop(&mut self) {
        if let Some(sender) = self.sender.take() {
            let _ = sender.send(Err(RecordingError::Cancelled));
        }
    }
}

/// A `record` call waiting for the camera worker.
#[derive(Debug)]
pub struct RecordingRequest {
    pub options: RecordOptions,
    pub resolver: RecordingResolver,
}

impl RecordingRequest {
    pub fn new(options: RecordOptions) -> (Self, PendingRecording) {
        let (sender, receiver) = oneshot::channel();
        let request = RecordingRequest {
            options,
            resolver: RecordingResolver { sender: Some(sender) },
        };
        (request, PendingRecording { receiver })
    }
}

/// Caller side of a recording.
#[derive(Debug)]
pub struct PendingRecording {
    receiver: oneshot::Receiver<RecordingOutcome>,
}

impl PendingRecording {
    pub async fn wait(self) -> RecordingOutcome {
        self.receiver.await.unwrap_or(Err(RecordingError::Cancelled))
    }

    /// Blocks the current thread. Must not be called from async code.
    pub fn blocking_wait(self) -> RecordingOutcome {
        self.receiver.blocking_recv().unwrap_or(Err(RecordingError::Cancelled))
    }

    pub fn try_result(&mut self) -> Option<RecordingOutcome> {
        match self.receiver.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(RecordingError::Cancelled)),
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    state: RecordingState,
    resolver: Option<RecordingResolver>,
}

/// Tracks the active recording and the caller waiting on it.
#[derive(Debug, Default)]
pub struct RecordingController {
    inner: Mutex<Inner>,
}

const START_FAILED: &str = "Starting video recording failed. Another recording might be in progress.";

impl RecordingController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RecordingState {
        self.lock().state
    }

    pub fn is_recording(&self) -> bool {
        self.state() != RecordingState::Idle
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start a recording with `start`, which asks the device and reports
    /// whether it accepted.
    ///
    /// The device is called without the controller lock held, so it may
    /// report `on_video_recorded` from inside `start`.
    pub fn begin<F>(&self, request: RecordingRequest, start: F)
    where
        F: FnOnce(&RecordOptions) -> Result<bool, CameraError>,
    {
        let RecordingRequest { options, resolver } = request;
        {
            let mut inner = self.lock();
            if inner.state != RecordingState::Idle {
                drop(inner);
                log::warn!("record requested while a recording is active");
                resolver.resolve(Err(RecordingError::CaptureStartFailure(START_FAILED.to_string())));
                return;
            }
            inner.state = RecordingState::Recording;
            inner.resolver = Some(resolver);
        }

        let failure = match start(&options) {
            Ok(true) => None,
            Ok(false) => Some(START_FAILED.to_string()),
            Err(e) => Some(format!("{} ({})", START_FAILED, e)),
        };

        if let Some(message) = failure {
            let resolver = {
                let mut inner = self.lock();
                inner.state = RecordingState::Idle;
                inner.resolver.take()
            };
            log::warn!("device refused to record: {}", message);
            if let Some(resolver) = resolver {
                resolver.resolve(Err(RecordingError::CaptureStartFailure(message)));
            }
        } else {
            log::info!("recording started");
        }
    }

    /// The host went to the background mid-recording.
    pub fn on_host_pause(&self) {
        let mut inner = self.lock();
        if inner.state == RecordingState::Recording {
            inner.state = RecordingState::RecordingInterrupted;
            log::info!("recording interrupted by host pause");
        }
    }

    /// The device finished writing the video, or failed to.
    ///
    /// Returns to `Idle` in every case. Returns whether a caller was waiting.
    pub fn on_video_recorded(&self, path: Option<String>, video_orientation: i32, device_orientation: i32) -> bool {
        let (resolver, interrupted) = {
            let mut inner = self.lock();
            let interrupted = inner.state == RecordingState::RecordingInterrupted;
            inner.state = RecordingState::Idle;
            (inner.resolver.take(), interrupted)
        };

        let Some(resolver) = resolver else {
            log::debug!("video recorded with no caller waiting");
            return false;
        };

        match path {
            Some(uri) => resolver.resolve(Ok(VideoResult {
                uri,
                is_recording_interrupted: interrupted,
                video_orientation,
                device_orientation,
            })),
            None => resolver.resolve(Err(RecordingError::NotRecording)),
        }
        true
    }

    /// Reject the waiting caller, if any, and return to `Idle`.
    pub fn cancel(&self) {
        let resolver = {
            let mut inner = self.lock();
            inner.state = RecordingState::Idle;
            inner.resolver.take()
        };
        if let Some(resolver) = resolver {
            resolver.resolve(Err(RecordingError::Cancelled));
        }
    }
}
