//! Events surfaced to the host UI layer.

use crate::capture::{CaptureId, PictureResult};
use crate::recording::RecordingStarted;
use crate::types::{AnalysisKind, DetectionResult};
use crossbeam_channel::{Receiver, Sender};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CameraEvent {
    CameraReady,
    MountError {
        message: String,
    },
    PictureTaken,
    /// Decode/save pipeline finished, even for fast-mode captures
    PictureSaved {
        id: CaptureId,
        #[serde(skip_serializing_if = "Option::is_none")]
        result: Option<PictureResult>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    RecordingStart(RecordingStarted),
    RecordingEnd,
    Analysis {
        kind: AnalysisKind,
        result: DetectionResult,
        /// JPEG of the analysed frame, barcode kinds only
        #[serde(skip_serializing_if = "Option::is_none")]
        image: Option<Vec<u8>>,
    },
    AnalysisError {
        kind: AnalysisKind,
        message: String,
    },
}

impl CameraEvent {
    pub fn name(&self) -> &'static str {
        match self {
            CameraEvent::CameraReady => "onCameraReady",
            CameraEvent::MountError { .. } => "onMountError",
            CameraEvent::PictureTaken => "onPictureTaken",
            CameraEvent::PictureSaved { .. } => "onPictureSaved",
            CameraEvent::RecordingStart(_) => "onRecordingStart",
            CameraEvent::RecordingEnd => "onRecordingEnd",
            CameraEvent::Analysis { kind, .. } => match kind {
                AnalysisKind::BarcodeScan => "onBarCodeRead",
                AnalysisKind::GoogleBarcode => "onGoogleVisionBarcodesDetected",
                AnalysisKind::Face => "onFacesDetected",
                AnalysisKind::Text => "onTextRecognized",
                AnalysisKind::Label => "onLabelsDetected",
                AnalysisKind::Object => "onObjectsDetected",
                AnalysisKind::Pose => "onPoseDetected",
            },
            CameraEvent::AnalysisError { kind, .. } => match kind {
                AnalysisKind::BarcodeScan => "onBarCodeReadError",
                AnalysisKind::GoogleBarcode => "onGoogleVisionBarcodeDetectionError",
                AnalysisKind::Face => "onFaceDetectionError",
                AnalysisKind::Text => "onTextRecognitionError",
                AnalysisKind::Label => "onImageLabelingError",
                AnalysisKind::Object => "onObjectDetectionError",
                AnalysisKind::Pose => "onPoseDetectionError",
            },
        }
    }
}

/// Host-side event channel. Must not block; called from worker threads.
pub trait EventEmitter: Send + Sync {
    fn emit(&self, event: CameraEvent);
}

/// Forwards events into an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelEmitter {
    sender: Sender<CameraEvent>,
}

impl ChannelEmitter {
    pub fn new() -> (Self, Receiver<CameraEvent>) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        (Self { sender }, receiver)
    }
}

impl EventEmitter for ChannelEmitter {
    fn emit(&self, event: CameraEvent) {
        if self.sender.send(event).is_err() {
            log::debug!("event receiver dropped; discarding event");
        }
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEmitter;

impl EventEmitter for NullEmitter {
    fn emit(&self, _event: CameraEvent) {}
}
