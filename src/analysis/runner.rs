//! Runs one analysis task off the capture thread.

use super::detector::Detector;
use super::gate::GatePermit;
use super::sink::ResultSink;
use crate::errors::DetectorError;
use crate::types::{AnalysisKind, AnalysisParams, Frame};
use serde::Serialize;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;

/// Per-kind task counters.
#[derive(Debug, Default)]
pub struct TaskStats {
    dispatched: [AtomicU64; AnalysisKind::COUNT],
    succeeded: [AtomicU64; AnalysisKind::COUNT],
    failed: [AtomicU64; AnalysisKind::COUNT],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KindStats {
    pub kind: AnalysisKind,
    pub dispatched: u64,
    pub succeeded: u64,
    pub failed: u64,
}

impl KindStats {
    pub fn in_flight(&self) -> u64 {
        self.dispatched
            .saturating_sub(self.succeeded)
            .saturating_sub(self.failed)
    }
}

impl TaskStats {
    fn bump(counters: &[AtomicU64; AnalysisKind::COUNT], kind: AnalysisKind) {
        counters[kind.index()].fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self, kind: AnalysisKind) -> KindStats {
        let i = kind.index();
        KindStats {
            kind,
            dispatched: self.dispatched[i].load(Ordering::Relaxed),
            succeeded: self.succeeded[i].load(Ordering::Relaxed),
            failed: self.failed[i].load(Ordering::Relaxed),
        }
    }

    pub fn snapshot(&self) -> Vec<KindStats> {
        AnalysisKind::all().map(|k| self.get(k)).collect()
    }
}

/// Executes detectors on the runtime's blocking pool.
///
/// Every task owns the [`GatePermit`] for its kind; the permit is dropped
/// after the sink has been told, on success, error and panic alike.
pub struct TaskRunner {
    handle: Handle,
    sink: Arc<dyn ResultSink>,
    stats: Arc<TaskStats>,
}

impl TaskRunner {
    pub fn new(handle: Handle, sink: Arc<dyn ResultSink>) -> Self {
        Self {
            handle,
            sink,
            stats: Arc::new(TaskStats::default()),
        }
    }

    pub fn stats(&self) -> &Arc<TaskStats> {
        &self.stats
    }

    pub fn run(&self, permit: GatePermit, frame: Frame, detector: Arc<dyn Detector>, params: AnalysisParams) {
        let kind = permit.kind();
        let sink = Arc::clone(&self.sink);
        let stats = Arc::clone(&self.stats);
        TaskStats::bump(&stats.dispatched, kind);

        self.handle.spawn_blocking(move || {
            let outcome = catch_unwind(AssertUnwindSafe(|| detector.analyze(&frame, &params)))
                .unwrap_or_else(|payload| {
                    let message = panic_message(payload.as_ref());
                    log::error!("{} detector panicked: {}", kind, message);
                    Err(DetectorError::Panicked { kind, message })
                });

            match outcome {
                Ok(result) => {
                    TaskStats::bump(&stats.succeeded, kind);
                    log::debug!("{} task finished with {} detections", kind, result.detections.len());
                    sink.on_result(kind, &frame, result);
                }
                Err(error) => {
                    TaskStats::bump(&stats.failed, kind);
                    log::warn!("{} task failed: {}", kind, error);
                    sink.on_error(kind, error);
                }
            }

            drop(permit);
        });
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
