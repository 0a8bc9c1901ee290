//! Still-capture requests and their one-shot resolution handles.

use crate::assert_invariant;
use crate::errors::CaptureError;
use crate::invariant_ppt::invariants;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use tokio::sync::oneshot;
use uuid::Uuid;

/// Opaque, unique handle for one `take_picture` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CaptureId(Uuid);

impl CaptureId {
    pub fn new() -> Self {
        CaptureId(Uuid::new_v4())
    }
}

impl Default for CaptureId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CaptureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Options for one still capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureOptions {
    /// Resolve the caller as soon as the picture is taken, without a payload
    pub fast_mode: bool,
    /// JPEG quality (1-100)
    pub quality: u8,
    /// Rotate pixels upright using the device orientation
    pub fix_orientation: bool,
    pub mirror_image: bool,
    /// Scale down to this width, keeping the aspect ratio
    pub width: Option<u32>,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            fast_mode: false,
            quality: 95,
            fix_orientation: false,
            mirror_image: false,
            width: None,
        }
    }
}

impl CaptureOptions {
    pub fn fast() -> Self {
        Self {
            fast_mode: true,
            ..Default::default()
        }
    }
}

/// What the decode/save pipeline produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PictureResult {
    pub uri: String,
    pub width: u32,
    pub height: u32,
    pub device_orientation: i32,
    pub picture_orientation: i32,
}

/// `Ok(None)` is a fast-mode resolution.
pub type CaptureOutcome = Result<Option<PictureResult>, CaptureError>;

/// Sending half of a capture's resolution.
///
/// Consumed by `resolve`, so a request can be settled at most once. A
/// resolver dropped without resolving rejects its caller with `Cancelled`.
pub struct CaptureResolver {
    id: CaptureId,
    sender: Option<oneshot::Sender<CaptureOutcome>>,
}

impl CaptureResolver {
    pub fn id(&self) -> CaptureId {
        self.id
    }

    pub fn resolve(mut self, outcome: CaptureOutcome) {
        let sender = self.sender.take();
        assert_invariant!(
            sender.is_some(),
            invariants::CAPTURE_RESOLVED_ONCE,
            "capture::request"
        );
        if let Some(sender) = sender {
            if sender.send(outcome).is_err() {
                log::debug!("capture {} resolved after its caller went away", self.id);
            }
        }
    }
}

impl Drop for CaptureResolver {
    fn drop(&mut self) {
        if let Some(sender) = self.sender.take() {
            log::debug!("capture {} dropped unresolved; cancelling", self.id);
            let _ = sender.send(Err(CaptureError::Cancelled));
        }
    }
}

impl fmt::Debug for CaptureResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureResolver")
            .field("id", &self.id)
            .field("pending", &self.sender.is_some())
            .finish()
    }
}

/// A queued still capture: who asked, with which options, and where the
/// picture goes.
#[derive(Debug)]
pub struct CaptureRequest {
    pub id: CaptureId,
    pub options: CaptureOptions,
    pub destination: PathBuf,
    pub resolver: CaptureResolver,
}

impl CaptureRequest {
    pub fn new(options: CaptureOptions, destination: impl Into<PathBuf>) -> (Self, PendingCapture) {
        let id = CaptureId::new();
        let (sender, receiver) = oneshot::channel();
        let request = CaptureRequest {
            id,
            options,
            destination: destination.into(),
            resolver: CaptureResolver {
                id,
                sender: Some(sender),
            },
        };
        (request, PendingCapture { id, receiver })
    }
}

/// Caller side of a capture.
#[derive(Debug)]
pub struct PendingCapture {
    id: CaptureId,
    receiver: oneshot::Receiver<CaptureOutcome>,
}

impl PendingCapture {
    pub fn id(&self) -> CaptureId {
        self.id
    }

    pub async fn wait(self) -> CaptureOutcome {
        self.receiver.await.unwrap_or(Err(CaptureError::Cancelled))
    }

    /// Blocks the current thread. Must not be called from async code.
    pub fn blocking_wait(self) -> CaptureOutcome {
        self.receiver.blocking_recv().unwrap_or(Err(CaptureError::Cancelled))
    }

    /// `None` while the capture is still pending.
    pub fn try_result(&mut self) -> Option<CaptureOutcome> {
        match self.receiver.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(CaptureError::Cancelled)),
        }
    }
}
