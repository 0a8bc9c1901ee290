//! Detector seam: every analysis kind is an opaque `analyze(frame) -> result`.

use crate::errors::DetectorError;
use crate::types::{AnalysisKind, AnalysisParams, DetectionResult, Frame};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Detector-side options. Forwarded to detectors when configuration
/// changes; they have no effect on scheduling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorSettings {
    pub face_mode: FaceMode,
    pub face_landmarks: bool,
    pub face_classifications: bool,
    pub face_tracking: bool,
    /// Bitmask of formats the ML barcode detector should report; 0 = all
    pub barcode_formats: u32,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            face_mode: FaceMode::Fast,
            face_landmarks: false,
            face_classifications: false,
            face_tracking: true,
            barcode_formats: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaceMode {
    #[default]
    Fast,
    Accurate,
}

pub trait Detector: Send + Sync {
    /// Run one analysis. Called on a worker thread, never concurrently for
    /// the same kind.
    fn analyze(&self, frame: &Frame, params: &AnalysisParams) -> Result<DetectionResult, DetectorError>;

    fn apply_settings(&self, _settings: &DetectorSettings) {}

    /// Free model resources when the host view is destroyed.
    fn release(&self) {}
}

/// Adapts a closure into a [`Detector`].
pub struct FnDetector<F>(F);

impl<F> FnDetector<F>
where
    F: Fn(&Frame, &AnalysisParams) -> Result<DetectionResult, DetectorError> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        FnDetector(f)
    }
}

impl<F> Detector for FnDetector<F>
where
    F: Fn(&Frame, &AnalysisParams) -> Result<DetectionResult, DetectorError> + Send + Sync,
{
    fn analyze(&self, frame: &Frame, params: &AnalysisParams) -> Result<DetectionResult, DetectorError> {
        (self.0)(frame, params)
    }
}

/// The detectors installed for a session, at most one per kind.
#[derive(Clone, Default)]
pub struct DetectorSet {
    detectors: [Option<Arc<dyn Detector>>; AnalysisKind::COUNT],
}

impl DetectorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: AnalysisKind, detector: impl Detector + 'static) -> Self {
        self.insert(kind, Arc::new(detector));
        self
    }

    pub fn insert(&mut self, kind: AnalysisKind, detector: Arc<dyn Detector>) {
        self.detectors[kind.index()] = Some(detector);
    }

    pub fn get(&self, kind: AnalysisKind) -> Option<&Arc<dyn Detector>> {
        self.detectors[kind.index()].as_ref()
    }

    pub fn contains(&self, kind: AnalysisKind) -> bool {
        self.get(kind).is_some()
    }

    pub fn apply_settings(&self, settings: &DetectorSettings) {
        for detector in self.detectors.iter().flatten() {
            detector.apply_settings(settings);
        }
    }

    pub fn release_all(&self) {
        for detector in self.detectors.iter().flatten() {
            detector.release();
        }
    }
}

impl std::fmt::Debug for DetectorSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let installed: Vec<_> = AnalysisKind::all().filter(|k| self.contains(*k)).collect();
        f.debug_struct("DetectorSet").field("installed", &installed).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fn_detector_and_set() {
        let set = DetectorSet::new().with(
            AnalysisKind::Text,
            FnDetector::new(|frame, _| Ok(DetectionResult::empty(frame))),
        );
        assert!(set.contains(AnalysisKind::Text));
        assert!(!set.contains(AnalysisKind::Face));

        let frame = Frame::new(vec![0u8; 6], 2, 2, 0);
        let params = AnalysisParams::for_kind(AnalysisKind::Text, &frame, &Default::default());
        let result = set.get(AnalysisKind::Text).unwrap().analyze(&frame, &params).unwrap();
        assert!(result.is_empty());
        assert_eq!(result.frame_width, 2);
    }

    #[test]
    fn test_default_settings() {
        let settings = DetectorSettings::default();
        assert_eq!(settings.face_mode, FaceMode::Fast);
        assert!(settings.face_tracking);
    }
}
