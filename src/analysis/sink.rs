//! Where finished analysis tasks report, and the host-facing suppression policy.

use super::flags::FeatureFlags;
use crate::errors::DetectorError;
use crate::events::{CameraEvent, EventEmitter};
use crate::image_utils::nv21_to_jpeg;
use crate::types::{AnalysisKind, DetectionResult, Frame};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

/// Receives the outcome of every analysis task, tagged with its kind.
///
/// Called from worker threads, possibly for several kinds at once.
pub trait ResultSink: Send + Sync {
    fn on_result(&self, kind: AnalysisKind, frame: &Frame, result: DetectionResult);
    fn on_error(&self, kind: AnalysisKind, error: DetectorError);
}

/// Turns task outcomes into [`CameraEvent`]s.
///
/// Drops anything for a kind that was disabled after its task was
/// dispatched, filters barcode scans against the allowlist and optionally
/// attaches the analysed frame as a JPEG to barcode events.
pub struct EventResultSink {
    flags: Arc<FeatureFlags>,
    emitter: Arc<dyn EventEmitter>,
    barcode_types: RwLock<Option<HashSet<String>>>,
    detected_image_in_event: AtomicBool,
}

impl EventResultSink {
    pub fn new(flags: Arc<FeatureFlags>, emitter: Arc<dyn EventEmitter>) -> Self {
        Self {
            flags,
            emitter,
            barcode_types: RwLock::new(None),
            detected_image_in_event: AtomicBool::new(false),
        }
    }

    /// Restrict scanned barcodes to these formats. `None` accepts all.
    pub fn set_barcode_types(&self, types: Option<Vec<String>>) {
        let set = types.map(|t| t.into_iter().collect::<HashSet<_>>());
        *self.barcode_types.write().unwrap_or_else(|e| e.into_inner()) = set;
    }

    pub fn set_detected_image_in_event(&self, enabled: bool) {
        self.detected_image_in_event.store(enabled, Ordering::Release);
    }

    fn barcode_allowed(&self, format: Option<&str>) -> bool {
        let guard = self.barcode_types.read().unwrap_or_else(|e| e.into_inner());
        match (guard.as_ref(), format) {
            (None, _) => true,
            (Some(types), Some(format)) => types.contains(format),
            (Some(_), None) => false,
        }
    }

    fn frame_image(&self, kind: AnalysisKind, frame: &Frame) -> Option<Vec<u8>> {
        if !kind.is_barcode() || !self.detected_image_in_event.load(Ordering::Acquire) {
            return None;
        }
        match nv21_to_jpeg(frame, 100) {
            Ok(jpeg) => Some(jpeg),
            Err(e) => {
                log::warn!("{} event sent without image: {}", kind, e);
                None
            }
        }
    }
}

impl ResultSink for EventResultSink {
    fn on_result(&self, kind: AnalysisKind, frame: &Frame, mut result: DetectionResult) {
        if !self.flags.is_enabled(kind) {
            log::debug!("{} disabled after dispatch; dropping result", kind);
            return;
        }

        if kind == AnalysisKind::BarcodeScan {
            result
                .detections
                .retain(|d| self.barcode_allowed(d.format.as_deref()));
            if result.is_empty() {
                return;
            }
        }

        let image = self.frame_image(kind, frame);
        self.emitter.emit(CameraEvent::Analysis { kind, result, image });
    }

    fn on_error(&self, kind: AnalysisKind, error: DetectorError) {
        if !self.flags.is_enabled(kind) {
            log::debug!("{} disabled after dispatch; dropping error: {}", kind, error);
            return;
        }
        self.emitter.emit(CameraEvent::AnalysisError {
            kind,
            message: error.to_string(),
        });
    }
}
