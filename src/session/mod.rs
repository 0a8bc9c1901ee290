//! A camera session: analysis dispatch, still capture, recording and the
//! host lifecycle wired around one camera device.

mod worker;

use crate::analysis::{
    DetectorSet, EventResultSink, FeatureFlags, FrameDispatcher, FrameStats, InversionMode, TaskRunner, TaskStats,
};
use crate::camera::CameraDevice;
use crate::capture::{
    CaptureCompletion, CaptureId, CaptureOptions, CaptureRequest, CaptureRequestQueue, JpegFilePipeline,
    PendingCapture, PicturePipeline,
};
use crate::config::ScanConfig;
use crate::errors::{CameraError, CaptureError};
use crate::events::{CameraEvent, EventEmitter, NullEmitter};
use crate::layout::{Orientation, PreviewLayout};
use crate::recording::{
    PendingRecording, RecordOptions, RecordingController, RecordingRequest, RecordingStarted, RecordingState,
};
use crate::types::{AnalysisKind, Facing, Frame, KindSet, ScanArea};
use bytes::Bytes;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::runtime::{Handle, Runtime};
use worker::{CameraWorker, WorkerCommand, WorkerContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    New,
    Resumed,
    Paused,
    Destroyed,
}

/// Builds a [`CameraSession`].
pub struct SessionBuilder {
    device: Box<dyn CameraDevice>,
    detectors: DetectorSet,
    emitter: Arc<dyn EventEmitter>,
    pipeline: Arc<dyn PicturePipeline>,
    config: ScanConfig,
    handle: Option<Handle>,
}

impl SessionBuilder {
    pub fn new(device: impl CameraDevice + 'static) -> Self {
        Self {
            device: Box::new(device),
            detectors: DetectorSet::new(),
            emitter: Arc::new(NullEmitter),
            pipeline: Arc::new(JpegFilePipeline::new()),
            config: ScanConfig::default(),
            handle: None,
        }
    }

    pub fn detectors(mut self, detectors: DetectorSet) -> Self {
        self.detectors = detectors;
        self
    }

    pub fn emitter(mut self, emitter: Arc<dyn EventEmitter>) -> Self {
        self.emitter = emitter;
        self
    }

    pub fn pipeline(mut self, pipeline: Arc<dyn PicturePipeline>) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn config(mut self, config: ScanConfig) -> Self {
        self.config = config;
        self
    }

    /// Run analysis on an existing runtime instead of a session-owned one.
    pub fn runtime_handle(mut self, handle: Handle) -> Self {
        self.handle = Some(handle);
        self
    }

    pub fn build(self) -> Result<CameraSession, CameraError> {
        self.config.validate().map_err(CameraError::ConfigError)?;

        let (runtime, handle) = match self.handle {
            Some(handle) => (None, handle),
            None => {
                let runtime = tokio::runtime::Builder::new_multi_thread()
                    .worker_threads(1)
                    .max_blocking_threads(self.config.runtime.worker_threads)
                    .thread_name("crabscan-analysis")
                    .enable_all()
                    .build()
                    .map_err(|e| CameraError::InitializationError(format!("analysis runtime: {}", e)))?;
                let handle = runtime.handle().clone();
                (Some(runtime), handle)
            }
        };

        let flags = Arc::new(FeatureFlags::new());
        let sink = Arc::new(EventResultSink::new(Arc::clone(&flags), Arc::clone(&self.emitter)));
        let runner = TaskRunner::new(handle.clone(), sink.clone());
        let dispatcher = FrameDispatcher::new(Arc::clone(&flags), self.detectors, runner);

        // pictures get their own pool so a hung detector cannot starve them
        let capture_runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(2)
            .thread_name("crabscan-capture")
            .enable_all()
            .build()
            .map_err(|e| CameraError::InitializationError(format!("capture runtime: {}", e)))?;

        let queue = Arc::new(CaptureRequestQueue::new());
        let completion = CaptureCompletion::new(
            Arc::clone(&queue),
            self.pipeline,
            Arc::clone(&self.emitter),
            capture_runtime.handle().clone(),
        );
        let recording = Arc::new(RecordingController::new());

        let worker = CameraWorker::spawn(
            self.device,
            WorkerContext {
                queue: Arc::clone(&queue),
                recording: Arc::clone(&recording),
                emitter: Arc::clone(&self.emitter),
                flags: Arc::clone(&flags),
                video_directory: PathBuf::from(&self.config.capture.output_directory),
            },
        )?;

        let session = CameraSession {
            flags,
            sink,
            dispatcher,
            completion,
            queue,
            recording,
            emitter: self.emitter,
            worker: Mutex::new(worker),
            lifecycle: Mutex::new(Lifecycle::New),
            runtime,
            capture_runtime: Some(capture_runtime),
        };
        session.apply_config(&self.config);
        Ok(session)
    }
}

/// One camera view's worth of scheduling state.
///
/// The device reports into the session through the `on_*` callbacks; the
/// host drives it with the lifecycle hooks, feature setters and the
/// capture/record calls.
pub struct CameraSession {
    flags: Arc<FeatureFlags>,
    sink: Arc<EventResultSink>,
    dispatcher: FrameDispatcher,
    completion: CaptureCompletion,
    queue: Arc<CaptureRequestQueue>,
    recording: Arc<RecordingController>,
    emitter: Arc<dyn EventEmitter>,
    worker: Mutex<CameraWorker>,
    lifecycle: Mutex<Lifecycle>,
    runtime: Option<Runtime>,
    capture_runtime: Option<Runtime>,
}

impl CameraSession {
    pub fn builder(device: impl CameraDevice + 'static) -> SessionBuilder {
        SessionBuilder::new(device)
    }

    fn send(&self, command: WorkerCommand) -> bool {
        self.worker.lock().unwrap_or_else(|e| e.into_inner()).send(command)
    }

    fn lifecycle(&self) -> std::sync::MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(|e| e.into_inner())
    }

    // Configuration

    /// Flip feature flags, inversion mode and barcode policy, and forward
    /// detector settings. Gates are not touched.
    pub fn apply_config(&self, config: &ScanConfig) {
        for kind in AnalysisKind::all() {
            self.flags.set(kind, config.analysis.is_enabled(kind));
        }
        self.send(WorkerCommand::SetScanning(self.flags.any_enabled()));
        self.dispatcher.set_inversion_mode(config.barcode.inversion_mode);
        self.sink.set_barcode_types(config.barcode.types.clone());
        self.sink
            .set_detected_image_in_event(config.barcode.detected_image_in_event);
        self.dispatcher.detectors().apply_settings(&config.detector_settings());
        log::debug!("configuration applied: {:?} enabled", self.flags.enabled());
    }

    pub fn set_analysis_enabled(&self, kind: AnalysisKind, enabled: bool) {
        if self.flags.set(kind, enabled) != enabled {
            log::debug!("{} analysis {}", kind, if enabled { "enabled" } else { "disabled" });
            self.send(WorkerCommand::SetScanning(self.flags.any_enabled()));
        }
    }

    pub fn is_scanning(&self) -> bool {
        self.flags.any_enabled()
    }

    pub fn enabled_kinds(&self) -> KindSet {
        self.flags.enabled()
    }

    pub fn set_inversion_mode(&self, mode: InversionMode) {
        self.dispatcher.set_inversion_mode(mode);
    }

    pub fn set_barcode_types(&self, types: Option<Vec<String>>) {
        self.sink.set_barcode_types(types);
    }

    pub fn set_detected_image_in_event(&self, enabled: bool) {
        self.sink.set_detected_image_in_event(enabled);
    }

    pub fn set_facing(&self, facing: Facing) {
        self.dispatcher.update_view(|v| v.facing = facing);
    }

    pub fn set_density(&self, density: f32) {
        self.dispatcher.update_view(|v| v.density = density);
    }

    pub fn set_scan_area(&self, area: Option<ScanArea>, camera_view_width: u32, camera_view_height: u32) {
        self.dispatcher.update_view(|v| {
            v.scan_area = area;
            v.camera_view_width = camera_view_width;
            v.camera_view_height = camera_view_height;
        });
    }

    /// Record the view size and letterbox padding used for analysis.
    pub fn on_layout(&self, view_width: u32, view_height: u32, aspect_ratio: f32) -> PreviewLayout {
        let layout = PreviewLayout::compute(
            view_width,
            view_height,
            aspect_ratio,
            Orientation::of(view_width, view_height),
        );
        self.dispatcher.update_view(|v| {
            v.view_width = view_width;
            v.view_height = view_height;
            v.aspect_ratio = aspect_ratio;
            v.padding_x = layout.padding_x;
            v.padding_y = layout.padding_y;
        });
        layout
    }

    // Device callbacks

    /// One preview frame. Never blocks on analysis.
    pub fn on_frame(&self, frame: Frame) -> KindSet {
        self.dispatcher.on_frame(frame)
    }

    /// A still picture arrived, in request order.
    pub fn on_picture_taken(&self, raw: impl Into<Bytes>, device_orientation: i32) -> Result<CaptureId, CaptureError> {
        self.completion.on_picture_ready(raw.into(), device_orientation)
    }

    pub fn on_recording_start(&self, uri: impl Into<String>, video_orientation: i32, device_orientation: i32) {
        self.emitter.emit(CameraEvent::RecordingStart(RecordingStarted {
            uri: uri.into(),
            video_orientation,
            device_orientation,
        }));
    }

    pub fn on_recording_end(&self) {
        self.emitter.emit(CameraEvent::RecordingEnd);
    }

    pub fn on_video_recorded(&self, path: Option<String>, video_orientation: i32, device_orientation: i32) {
        self.recording
            .on_video_recorded(path, video_orientation, device_orientation);
    }

    pub fn on_mount_error(&self, message: impl Into<String>) {
        self.emitter.emit(CameraEvent::MountError { message: message.into() });
    }

    // Caller operations

    pub fn take_picture(&self, options: CaptureOptions, destination: impl Into<PathBuf>) -> PendingCapture {
        let (request, pending) = CaptureRequest::new(options, destination);
        self.send(WorkerCommand::TakePicture(request));
        pending
    }

    pub fn record(&self, options: RecordOptions) -> PendingRecording {
        let (request, pending) = RecordingRequest::new(options);
        self.send(WorkerCommand::Record(request));
        pending
    }

    pub fn stop_recording(&self) {
        self.send(WorkerCommand::StopRecording);
    }

    pub fn recording_state(&self) -> RecordingState {
        self.recording.state()
    }

    pub fn pending_captures(&self) -> usize {
        self.queue.len()
    }

    pub fn frame_stats(&self) -> FrameStats {
        self.dispatcher.frame_stats()
    }

    pub fn task_stats(&self) -> &Arc<TaskStats> {
        self.dispatcher.task_stats()
    }

    pub fn busy_kinds(&self) -> KindSet {
        self.dispatcher.gates().busy_kinds()
    }

    // Host lifecycle

    pub fn on_host_resume(&self) {
        let mut lifecycle = self.lifecycle();
        match *lifecycle {
            Lifecycle::New | Lifecycle::Paused => {
                self.send(WorkerCommand::Resume);
                *lifecycle = Lifecycle::Resumed;
            }
            Lifecycle::Resumed => {}
            Lifecycle::Destroyed => log::warn!("resume after destroy ignored"),
        }
    }

    pub fn on_host_pause(&self) {
        let mut lifecycle = self.lifecycle();
        self.recording.on_host_pause();
        if *lifecycle == Lifecycle::Resumed {
            self.send(WorkerCommand::Pause);
            *lifecycle = Lifecycle::Paused;
        }
    }

    /// Release the camera and detectors and cancel everything pending.
    pub fn on_host_destroy(&self) {
        {
            let mut lifecycle = self.lifecycle();
            if *lifecycle == Lifecycle::Destroyed {
                return;
            }
            *lifecycle = Lifecycle::Destroyed;
        }

        self.worker.lock().unwrap_or_else(|e| e.into_inner()).shutdown();
        let cancelled = self.queue.cancel_all();
        self.recording.cancel();
        self.dispatcher.detectors().release_all();
        log::info!("session destroyed ({} capture(s) cancelled)", cancelled);
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        self.on_host_destroy();
        for runtime in [self.runtime.take(), self.capture_runtime.take()].into_iter().flatten() {
            runtime.shutdown_background();
        }
    }
}
