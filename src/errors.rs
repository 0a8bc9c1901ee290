use crate::types::AnalysisKind;

/// Failures reported by the camera device collaborator.
#[derive(Debug, thiserror::Error)]
pub enum CameraError {
    #[error("Camera initialization error: {0}")]
    InitializationError(String),
    #[error("Capture error: {0}")]
    CaptureError(String),
    #[error("Recording error: {0}")]
    RecordingError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("IO error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for CameraError {
    fn from(e: std::io::Error) -> Self {
        CameraError::IoError(e.to_string())
    }
}

/// A detector's `analyze` call did not produce a result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DetectorError {
    #[error("{kind} detector failed: {message}")]
    Failed { kind: AnalysisKind, message: String },
    #[error("{kind} detector panicked: {message}")]
    Panicked { kind: AnalysisKind, message: String },
}

impl DetectorError {
    pub fn failed(kind: AnalysisKind, message: impl Into<String>) -> Self {
        DetectorError::Failed {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> AnalysisKind {
        match self {
            DetectorError::Failed { kind, .. }
            | DetectorError::Panicked { kind, .. } => *kind,
        }
    }
}

/// Still-capture failures delivered to the caller of `take_picture`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaptureError {
    /// A picture arrived while no request was pending.
    #[error("picture delivered with no pending capture request")]
    QueueDesynchronization,
    #[error("{0}")]
    CaptureStartFailure(String),
    #[error("capture request was cancelled before a picture arrived")]
    Cancelled,
    #[error("picture pipeline failed: {0}")]
    Pipeline(String),
}

impl CaptureError {
    /// Promise code reported to the host.
    pub fn code(&self) -> &'static str {
        match self {
            CaptureError::QueueDesynchronization => "E_QUEUE_DESYNC",
            CaptureError::CaptureStartFailure(_) => "E_TAKE_PICTURE_FAILED",
            CaptureError::Cancelled => "E_CANCELLED",
            CaptureError::Pipeline(_) => "E_PICTURE_PIPELINE",
        }
    }
}

/// Video recording failures delivered to the caller of `record`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordingError {
    #[error("{0}")]
    CaptureStartFailure(String),
    #[error("Couldn't stop recording - there is none in progress")]
    NotRecording,
    #[error("recording was cancelled")]
    Cancelled,
}

impl RecordingError {
    pub fn code(&self) -> &'static str {
        match self {
            RecordingError::CaptureStartFailure(_) => "E_RECORDING_FAILED",
            RecordingError::NotRecording => "E_RECORDING",
            RecordingError::Cancelled => "E_CANCELLED",
        }
    }
}
