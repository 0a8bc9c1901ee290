//! Dedicated thread that owns the camera device.

use crate::analysis::FeatureFlags;
use crate::camera::CameraDevice;
use crate::capture::{CaptureRequest, CaptureRequestQueue};
use crate::errors::{CameraError, CaptureError};
use crate::events::{CameraEvent, EventEmitter};
use crate::recording::{RecordingController, RecordingRequest};
use crossbeam_channel::{Receiver, Sender};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;

pub(crate) enum WorkerCommand {
    TakePicture(CaptureRequest),
    Record(RecordingRequest),
    StopRecording,
    SetScanning(bool),
    Resume,
    Pause,
    Destroy,
}

impl WorkerCommand {
    fn name(&self) -> &'static str {
        match self {
            WorkerCommand::TakePicture(_) => "take_picture",
            WorkerCommand::Record(_) => "record",
            WorkerCommand::StopRecording => "stop_recording",
            WorkerCommand::SetScanning(_) => "set_scanning",
            WorkerCommand::Resume => "resume",
            WorkerCommand::Pause => "pause",
            WorkerCommand::Destroy => "destroy",
        }
    }
}

pub(crate) struct WorkerContext {
    pub queue: Arc<CaptureRequestQueue>,
    pub recording: Arc<RecordingController>,
    pub emitter: Arc<dyn EventEmitter>,
    pub flags: Arc<FeatureFlags>,
    pub video_directory: PathBuf,
}

/// Stops the device when the worker exits, however it exits.
struct DeviceGuard {
    device: Box<dyn CameraDevice>,
}

impl Drop for DeviceGuard {
    fn drop(&mut self) {
        if self.device.is_opened() {
            log::info!("stopping camera on worker exit");
            self.device.stop();
        }
    }
}

pub(crate) struct CameraWorker {
    sender: Sender<WorkerCommand>,
    thread: Option<JoinHandle<()>>,
}

impl CameraWorker {
    pub fn spawn(device: Box<dyn CameraDevice>, ctx: WorkerContext) -> Result<Self, CameraError> {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let thread = std::thread::Builder::new()
            .name("crabscan-camera".to_string())
            .spawn(move || worker_loop(DeviceGuard { device }, receiver, ctx))
            .map_err(|e| CameraError::InitializationError(format!("spawn failed: {e}")))?;
        Ok(Self {
            sender,
            thread: Some(thread),
        })
    }

    /// Queue a command. A command that cannot be delivered is dropped,
    /// which cancels any caller waiting on it.
    pub fn send(&self, command: WorkerCommand) -> bool {
        match self.sender.send(command) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("camera worker is gone; dropping {}", e.0.name());
                false
            }
        }
    }

    /// Stop the worker and wait for it to release the device.
    pub fn shutdown(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        self.send(WorkerCommand::Destroy);
        if thread.thread().id() == std::thread::current().id() {
            log::warn!("camera worker asked to join itself");
            return;
        }
        if thread.join().is_err() {
            log::error!("camera worker panicked");
        }
    }
}

impl Drop for CameraWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(mut guard: DeviceGuard, receiver: Receiver<WorkerCommand>, ctx: WorkerContext) {
    log::debug!("camera worker started");
    while let Ok(command) = receiver.recv() {
        let device = &mut guard.device;
        match command {
            WorkerCommand::TakePicture(request) => {
                let id = request.id;
                let options = request.options.clone();
                ctx.queue.enqueue(request);
                if let Err(e) = device.take_picture(&options) {
                    log::warn!("take_picture failed for {}: {}", id, e);
                    if let Some(request) = ctx.queue.remove(id) {
                        request
                            .resolver
                            .resolve(Err(CaptureError::CaptureStartFailure(format!("Take picture failed: {}", e))));
                    }
                }
            }
            WorkerCommand::Record(mut request) => {
                request.options.resolve_path(&ctx.video_directory);
                ctx.recording.begin(request, |options| device.record(options));
            }
            WorkerCommand::StopRecording => device.stop_recording(),
            WorkerCommand::SetScanning(scanning) => device.set_scanning(scanning),
            WorkerCommand::Resume => {
                if device.is_opened() {
                    continue;
                }
                match device.start() {
                    Ok(()) => {
                        device.set_scanning(ctx.flags.any_enabled());
                        log::info!("camera started");
                        ctx.emitter.emit(CameraEvent::CameraReady);
                    }
                    Err(e) => {
                        log::error!("camera failed to start: {}", e);
                        ctx.emitter.emit(CameraEvent::MountError {
                            message: e.to_string(),
                        });
                    }
                }
            }
            WorkerCommand::Pause => {
                if device.is_opened() {
                    device.stop();
                    log::info!("camera paused");
                }
            }
            WorkerCommand::Destroy => break,
        }
    }
    log::debug!("camera worker exiting");
}
