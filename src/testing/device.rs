//! A camera device driven by the test instead of hardware.

use crate::camera::CameraDevice;
use crate::capture::CaptureOptions;
use crate::errors::CameraError;
use crate::recording::RecordOptions;
use std::sync::{Arc, Mutex};

/// Calls the session made on the device, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    Start,
    Stop,
    TakePicture(CaptureOptions),
    Record(RecordOptions),
    StopRecording,
    SetScanning(bool),
}

#[derive(Debug, Default)]
struct Script {
    opened: bool,
    fail_start: bool,
    fail_take_picture: bool,
    refuse_record: bool,
    calls: Vec<DeviceCall>,
}

/// Test-side handle onto a [`ScriptedCamera`].
#[derive(Debug, Clone, Default)]
pub struct CameraProbe {
    script: Arc<Mutex<Script>>,
}

impl CameraProbe {
    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn calls(&self) -> Vec<DeviceCall> {
        self.lock().calls.clone()
    }

    pub fn is_opened(&self) -> bool {
        self.lock().opened
    }

    pub fn set_fail_start(&self, fail: bool) {
        self.lock().fail_start = fail;
    }

    pub fn set_fail_take_picture(&self, fail: bool) {
        self.lock().fail_take_picture = fail;
    }

    pub fn set_refuse_record(&self, refuse: bool) {
        self.lock().refuse_record = refuse;
    }

    /// Last scanning state the session reported
    pub fn scanning(&self) -> Option<bool> {
        self.lock().calls.iter().rev().find_map(|c| match c {
            DeviceCall::SetScanning(s) => Some(*s),
            _ => None,
        })
    }
}

pub struct ScriptedCamera {
    probe: CameraProbe,
}

impl ScriptedCamera {
    pub fn new() -> (Self, CameraProbe) {
        let probe = CameraProbe::default();
        (Self { probe: probe.clone() }, probe)
    }
}

impl CameraDevice for ScriptedCamera {
    fn start(&mut self) -> Result<(), CameraError> {
        let mut script = self.probe.lock();
        script.calls.push(DeviceCall::Start);
        if script.fail_start {
            return Err(CameraError::InitializationError("scripted start failure".into()));
        }
        script.opened = true;
        Ok(())
    }

    fn stop(&mut self) {
        let mut script = self.probe.lock();
        script.calls.push(DeviceCall::Stop);
        script.opened = false;
    }

    fn is_opened(&self) -> bool {
        self.probe.lock().opened
    }

    fn take_picture(&mut self, options: &CaptureOptions) -> Result<(), CameraError> {
        let mut script = self.probe.lock();
        script.calls.push(DeviceCall::TakePicture(options.clone()));
        if script.fail_take_picture {
            return Err(CameraError::CaptureError("scripted capture failure".into()));
        }
        Ok(())
    }

    fn record(&mut self, options: &RecordOptions) -> Result<bool, CameraError> {
        let mut script = self.probe.lock();
        script.calls.push(DeviceCall::Record(options.clone()));
        Ok(!script.refuse_record)
    }

    fn stop_recording(&mut self) {
        self.probe.lock().calls.push(DeviceCall::StopRecording);
    }

    fn set_scanning(&mut self, scanning: bool) {
        self.probe.lock().calls.push(DeviceCall::SetScanning(scanning));
    }
}
