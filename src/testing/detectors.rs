//! Scripted detectors and a recording result sink.

use crate::analysis::{Detector, DetectorSettings, ResultSink};
use crate::errors::DetectorError;
use crate::types::{AnalysisKind, AnalysisParams, Detection, DetectionResult, Frame, FrameRegion};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What a [`ScriptedDetector`] does on every call.
#[derive(Debug, Clone)]
pub enum Behavior {
    /// One detection with this value
    Succeed(String),
    Empty,
    Fail(String),
    Panic(String),
    /// Sleep, then one detection
    Slow(Duration),
}

/// Concurrency and call bookkeeping shared with the test.
#[derive(Debug, Default)]
pub struct Probe {
    calls: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
    inverted_calls: AtomicUsize,
    released: AtomicBool,
    settings: Mutex<Option<DetectorSettings>>,
    params: Mutex<Vec<AnalysisParams>>,
}

impl Probe {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of overlapping `analyze` calls seen
    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub fn inverted_calls(&self) -> usize {
        self.inverted_calls.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    pub fn last_settings(&self) -> Option<DetectorSettings> {
        self.settings.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Params of every call, in call order
    pub fn params(&self) -> Vec<AnalysisParams> {
        self.params.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

pub struct ScriptedDetector {
    kind: AnalysisKind,
    behavior: Behavior,
    probe: Arc<Probe>,
}

impl ScriptedDetector {
    pub fn new(kind: AnalysisKind, behavior: Behavior) -> (Self, Arc<Probe>) {
        let probe = Arc::new(Probe::default());
        (
            Self {
                kind,
                behavior,
                probe: Arc::clone(&probe),
            },
            probe,
        )
    }
}

struct ActiveGuard<'a>(&'a Probe);

impl<'a> ActiveGuard<'a> {
    fn enter(probe: &'a Probe) -> Self {
        let now = probe.active.fetch_add(1, Ordering::SeqCst) + 1;
        probe.max_active.fetch_max(now, Ordering::SeqCst);
        ActiveGuard(probe)
    }
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Detector for ScriptedDetector {
    fn analyze(&self, frame: &Frame, params: &AnalysisParams) -> Result<DetectionResult, DetectorError> {
        let _active = ActiveGuard::enter(&self.probe);
        self.probe.calls.fetch_add(1, Ordering::SeqCst);
        if params.inverted {
            self.probe.inverted_calls.fetch_add(1, Ordering::SeqCst);
        }
        self.probe
            .params
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(params.clone());

        // the centre quarter of the frame
        let bounds = FrameRegion::from_pixels(
            frame.width / 4,
            frame.height / 4,
            frame.width / 2,
            frame.height / 2,
            frame.width,
            frame.height,
        );
        let one = |value: &str| DetectionResult {
            detections: vec![Detection {
                bounds: Some(bounds),
                ..Detection::with_value(self.kind.as_str(), value)
            }],
            frame_width: frame.width,
            frame_height: frame.height,
        };

        match &self.behavior {
            Behavior::Succeed(value) => Ok(one(value)),
            Behavior::Empty => Ok(DetectionResult::empty(frame)),
            Behavior::Fail(message) => Err(DetectorError::failed(self.kind, message.clone())),
            Behavior::Panic(message) => panic!("{}", message),
            Behavior::Slow(delay) => {
                std::thread::sleep(*delay);
                Ok(one("slow"))
            }
        }
    }

    fn apply_settings(&self, settings: &DetectorSettings) {
        *self.probe.settings.lock().unwrap_or_else(|e| e.into_inner()) = Some(settings.clone());
    }

    fn release(&self) {
        self.probe.released.store(true, Ordering::SeqCst);
    }
}

/// One outcome seen by a [`RecordingSink`].
#[derive(Debug, Clone, PartialEq)]
pub enum SinkRecord {
    Result(AnalysisKind, DetectionResult),
    Error(AnalysisKind, DetectorError),
}

impl SinkRecord {
    pub fn kind(&self) -> AnalysisKind {
        match self {
            SinkRecord::Result(kind, _) | SinkRecord::Error(kind, _) => *kind,
        }
    }
}

/// Keeps every outcome and forwards it to a channel for waiting tests.
pub struct RecordingSink {
    records: Mutex<Vec<SinkRecord>>,
    sender: crossbeam_channel::Sender<SinkRecord>,
}

impl RecordingSink {
    pub fn new() -> (Self, crossbeam_channel::Receiver<SinkRecord>) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        (
            Self {
                records: Mutex::new(Vec::new()),
                sender,
            },
            receiver,
        )
    }

    pub fn records(&self) -> Vec<SinkRecord> {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn push(&self, record: SinkRecord) {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(record.clone());
        let _ = self.sender.send(record);
    }
}

impl ResultSink for RecordingSink {
    fn on_result(&self, kind: AnalysisKind, _frame: &Frame, result: DetectionResult) {
        self.push(SinkRecord::Result(kind, result));
    }

    fn on_error(&self, kind: AnalysisKind, error: DetectorError) {
        self.push(SinkRecord::Error(kind, error));
    }
}
