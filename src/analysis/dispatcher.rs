//! Per-frame dispatch decision.

use super::detector::DetectorSet;
use super::flags::FeatureFlags;
use super::gate::GateTable;
use super::runner::{TaskRunner, TaskStats};
use crate::assert_invariant;
use crate::invariant_ppt::invariants;
use crate::types::{AnalysisKind, AnalysisParams, Frame, KindSet, ViewGeometry};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, RwLock};

/// How frames handed to the `GoogleBarcode` detector are inverted, which
/// lets it find light-on-dark codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InversionMode {
    #[default]
    Normal,
    /// Invert every other dispatch, starting with a plain frame
    Alternate,
    Inverted,
}

impl InversionMode {
    fn to_u8(self) -> u8 {
        match self {
            InversionMode::Normal => 0,
            InversionMode::Alternate => 1,
            InversionMode::Inverted => 2,
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            1 => InversionMode::Alternate,
            2 => InversionMode::Inverted,
            _ => InversionMode::Normal,
        }
    }
}

/// Frame callback state. Held for the whole of `on_frame`, which keeps
/// frame callbacks mutually exclusive even if a host delivers them from
/// more than one thread.
#[derive(Debug, Default)]
struct FrameState {
    invert_next: bool,
}

#[derive(Debug, Default)]
struct FrameCounters {
    seen: AtomicU64,
    idle: AtomicU64,
    malformed: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameStats {
    pub seen: u64,
    /// Frames that arrived with nothing eligible
    pub idle: u64,
    /// Frames dropped for failing the NV21 size check
    pub malformed: u64,
}

pub struct FrameDispatcher {
    flags: Arc<FeatureFlags>,
    gates: Arc<GateTable>,
    detectors: DetectorSet,
    runner: TaskRunner,
    view: RwLock<ViewGeometry>,
    inversion_mode: AtomicU8,
    state: Mutex<FrameState>,
    counters: FrameCounters,
}

impl FrameDispatcher {
    pub fn new(flags: Arc<FeatureFlags>, detectors: DetectorSet, runner: TaskRunner) -> Self {
        Self {
            flags,
            gates: Arc::new(GateTable::new()),
            detectors,
            runner,
            view: RwLock::new(ViewGeometry::default()),
            inversion_mode: AtomicU8::new(InversionMode::Normal.to_u8()),
            state: Mutex::new(FrameState::default()),
            counters: FrameCounters::default(),
        }
    }

    pub fn flags(&self) -> &Arc<FeatureFlags> {
        &self.flags
    }

    pub fn gates(&self) -> &Arc<GateTable> {
        &self.gates
    }

    pub fn detectors(&self) -> &DetectorSet {
        &self.detectors
    }

    pub fn task_stats(&self) -> &Arc<TaskStats> {
        self.runner.stats()
    }

    pub fn frame_stats(&self) -> FrameStats {
        FrameStats {
            seen: self.counters.seen.load(Ordering::Relaxed),
            idle: self.counters.idle.load(Ordering::Relaxed),
            malformed: self.counters.malformed.load(Ordering::Relaxed),
        }
    }

    pub fn inversion_mode(&self) -> InversionMode {
        InversionMode::from_u8(self.inversion_mode.load(Ordering::Acquire))
    }

    /// Changing the mode restarts alternation from a plain frame.
    pub fn set_inversion_mode(&self, mode: InversionMode) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        self.inversion_mode.store(mode.to_u8(), Ordering::Release);
        state.invert_next = false;
    }

    pub fn update_view<F: FnOnce(&mut ViewGeometry)>(&self, update: F) {
        let mut view = self.view.write().unwrap_or_else(|e| e.into_inner());
        update(&mut view);
    }

    pub fn view(&self) -> ViewGeometry {
        self.view.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Kinds that would be dispatched if a valid frame arrived now.
    pub fn eligible(&self) -> KindSet {
        AnalysisKind::all()
            .filter(|k| self.flags.is_enabled(*k) && self.gates.is_free(*k) && self.detectors.contains(*k))
            .collect()
    }

    /// Decide which kinds run on `frame` and hand each to the runner.
    ///
    /// Never blocks on analysis: gate acquisition is a test-and-set and
    /// detectors run on the blocking pool. Returns the dispatched kinds.
    pub fn on_frame(&self, frame: Frame) -> KindSet {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        self.counters.seen.fetch_add(1, Ordering::Relaxed);

        let eligible = self.eligible();
        if eligible.is_empty() {
            self.counters.idle.fetch_add(1, Ordering::Relaxed);
            return KindSet::empty();
        }

        if !frame.is_valid() {
            self.counters.malformed.fetch_add(1, Ordering::Relaxed);
            log::debug!(
                "dropping malformed frame: {} bytes for {}x{}",
                frame.data.len(),
                frame.width,
                frame.height
            );
            return KindSet::empty();
        }

        let view = self.view();
        let mode = self.inversion_mode();
        let mut dispatched = KindSet::empty();

        for kind in eligible.iter() {
            let Some(detector) = self.detectors.get(kind).cloned() else {
                continue;
            };
            let permit = self.gates.acquire_permit(kind);
            assert_invariant!(
                permit.is_some(),
                invariants::GATE_ACQUIRED_AFTER_ELIGIBLE,
                "analysis::dispatcher"
            );
            let Some(permit) = permit else {
                continue;
            };

            let mut params = AnalysisParams::for_kind(kind, &frame, &view);
            let task_frame = if kind == AnalysisKind::GoogleBarcode {
                let invert = state.next_inversion(mode);
                params.inverted = invert;
                if invert {
                    frame.inverted()
                } else {
                    frame.clone()
                }
            } else {
                frame.clone()
            };

            self.runner.run(permit, task_frame, detector, params);
            dispatched.insert(kind);
        }

        log::debug!("dispatched {:?}", dispatched);
        dispatched
    }
}

impl FrameState {
    fn next_inversion(&mut self, mode: InversionMode) -> bool {
        match mode {
            InversionMode::Normal => false,
            InversionMode::Inverted => true,
            InversionMode::Alternate => {
                let invert = self.invert_next;
                self.invert_next = !invert;
                invert
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::detector::FnDetector;
    use crate::analysis::sink::ResultSink;
    use crate::errors::DetectorError;
    use crate::types::DetectionResult;
    use std::sync::atomic::AtomicBool;

    struct NoopSink;

    impl ResultSink for NoopSink {
        fn on_result(&self, _: AnalysisKind, _: &Frame, _: DetectionResult) {}
        fn on_error(&self, _: AnalysisKind, _: DetectorError) {}
    }

    fn dispatcher(rt: &tokio::runtime::Runtime, detectors: DetectorSet, enabled: &[AnalysisKind]) -> FrameDispatcher {
        let flags = Arc::new(FeatureFlags::with_enabled(enabled.iter().copied()));
        let runner = TaskRunner::new(rt.handle().clone(), Arc::new(NoopSink));
        FrameDispatcher::new(flags, detectors, runner)
    }

    fn all_detectors() -> DetectorSet {
        let mut set = DetectorSet::new();
        for kind in AnalysisKind::all() {
            set.insert(kind, Arc::new(FnDetector::new(|f, _| Ok(DetectionResult::empty(f)))));
        }
        set
    }

    fn valid_frame() -> Frame {
        Frame::new(vec![7u8; Frame::min_nv21_len(4, 4)], 4, 4, 0)
    }

    #[test]
    fn test_nothing_enabled_is_idle() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let d = dispatcher(&rt, all_detectors(), &[]);
        assert!(d.on_frame(Frame::new(Vec::<u8>::new(), 640, 480, 0)).is_empty());
        let stats = d.frame_stats();
        assert_eq!(stats.idle, 1);
        assert_eq!(stats.malformed, 0);
    }

    #[test]
    fn test_malformed_frame_dispatches_nothing() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let d = dispatcher(&rt, all_detectors(), &[AnalysisKind::Face]);
        let short = Frame::new(vec![0u8; Frame::min_nv21_len(4, 4) - 1], 4, 4, 0);
        assert!(d.on_frame(short).is_empty());
        assert_eq!(d.frame_stats().malformed, 1);
        assert!(d.gates().is_free(AnalysisKind::Face));
    }

    #[test]
    fn test_missing_detector_is_never_eligible() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let d = dispatcher(&rt, DetectorSet::new(), &[AnalysisKind::Text]);
        assert!(d.on_frame(valid_frame()).is_empty());
    }

    #[test]
    fn test_busy_kind_is_skipped() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let release = Arc::new(AtomicBool::new(false));
        let r = Arc::clone(&release);
        let detectors = DetectorSet::new()
            .with(
                AnalysisKind::Face,
                FnDetector::new(move |f, _| {
                    while !r.load(Ordering::Acquire) {
                        std::thread::sleep(std::time::Duration::from_millis(1));
                    }
                    Ok(DetectionResult::empty(f))
                }),
            )
            .with(AnalysisKind::Label, FnDetector::new(|f, _| Ok(DetectionResult::empty(f))));
        let d = dispatcher(&rt, detectors, &[AnalysisKind::Face, AnalysisKind::Label]);

        let first = d.on_frame(valid_frame());
        assert!(first.contains(AnalysisKind::Face));
        assert!(d.gates().busy_kinds().contains(AnalysisKind::Face));

        let second = d.on_frame(valid_frame());
        assert!(!second.contains(AnalysisKind::Face));

        release.store(true, Ordering::Release);
    }

    #[test]
    fn test_alternate_starts_plain() {
        let mut state = FrameState::default();
        let seq: Vec<bool> = (0..4).map(|_| state.next_inversion(InversionMode::Alternate)).collect();
        assert_eq!(seq, vec![false, true, false, true]);
        assert!(!state.next_inversion(InversionMode::Normal));
        assert!(state.next_inversion(InversionMode::Inverted));
    }

    #[test]
    fn test_mode_change_resets_alternation() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let d = dispatcher(&rt, all_detectors(), &[]);
        d.set_inversion_mode(InversionMode::Alternate);
        d.state.lock().unwrap().invert_next = true;
        d.set_inversion_mode(InversionMode::Alternate);
        assert!(!d.state.lock().unwrap().invert_next);
        assert_eq!(d.inversion_mode(), InversionMode::Alternate);
    }

    #[test]
    fn test_view_update_is_visible() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let d = dispatcher(&rt, all_detectors(), &[]);
        d.update_view(|v| {
            v.padding_x = -12;
            v.density = 2.5;
        });
        let view = d.view();
        assert_eq!(view.padding_x, -12);
        assert_eq!(view.density, 2.5);
    }
}
