//! Per-frame analysis scheduling.
//!
//! Each [`AnalysisKind`](crate::types::AnalysisKind) has one gate in a
//! [`GateTable`]. A frame dispatches a kind only if the kind is enabled, its
//! gate is free and a detector is installed; the task then owns the gate
//! until it has reported to the [`ResultSink`]. A busy kind is skipped, never
//! queued.

mod detector;
mod dispatcher;
mod flags;
mod gate;
mod runner;
mod sink;

pub use detector::{Detector, DetectorSet, DetectorSettings, FaceMode, FnDetector};
pub use dispatcher::{FrameDispatcher, FrameStats, InversionMode};
pub use flags::FeatureFlags;
pub use gate::{GatePermit, GateTable, TaskGate};
pub use runner::{KindStats, TaskRunner, TaskStats};
pub use sink::{EventResultSink, ResultSink};
