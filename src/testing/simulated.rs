//! In-process backend with a shared call journal.
//!
//! Clones share state, so a test can hand one clone to the session worker
//! and inspect the other.

use super::synthetic_photo;
use crate::completion::PhotoEventSender;
use crate::errors::CameraError;
use crate::platform::CaptureBackend;
use crate::types::{
    CameraPosition, CaptureDevice, CaptureRequest, DeviceInput, DeviceType, PhotoOutputConfig,
    PhotoResult, SessionPreset,
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    Devices,
    BeginConfiguration,
    CommitConfiguration,
    SetPreset(SessionPreset),
    AddInput(String),
    RemoveInput(String),
    AddOutput,
    StartRunning,
    CapturePhoto { device: String, request_id: Uuid },
}

#[derive(Debug, Clone)]
pub struct JournalEntry {
    pub at: Instant,
    pub call: BackendCall,
}

struct SimState {
    devices: Vec<CaptureDevice>,
    attached: Vec<DeviceInput>,
    output: Option<PhotoOutputConfig>,
    preset: Option<SessionPreset>,
    running: bool,
    configuring: bool,
    rejected: HashSet<String>,
    fail_processing: bool,
    photo_size: (u32, u32),
    journal: Vec<JournalEntry>,
}

#[derive(Clone)]
pub struct SimulatedBackend {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedBackend {
    pub fn new(devices: Vec<CaptureDevice>) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                devices,
                attached: Vec::new(),
                output: None,
                preset: None,
                running: false,
                configuring: false,
                rejected: HashSet::new(),
                fail_processing: false,
                photo_size: (32, 24),
                journal: Vec::new(),
            })),
        }
    }

    /// Front and back wide-angle cameras plus a microphone and an external webcam.
    pub fn phone() -> Self {
        Self::new(vec![
            CaptureDevice::new("mic", "Built-in Microphone", CameraPosition::Unspecified)
                .with_media_types(vec![crate::types::MediaType::Audio]),
            CaptureDevice::new("front", "Front Camera", CameraPosition::Front),
            CaptureDevice::new("back", "Back Camera", CameraPosition::Back),
            CaptureDevice::new("usb", "USB Webcam", CameraPosition::Unspecified)
                .with_device_type(DeviceType::External),
        ])
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Refuse every future add of this device.
    pub fn reject_input(&self, device_id: &str) {
        self.lock().rejected.insert(device_id.to_string());
    }

    pub fn allow_input(&self, device_id: &str) {
        self.lock().rejected.remove(device_id);
    }

    /// Make every capture report a processing error instead of bytes.
    pub fn fail_processing(&self, fail: bool) {
        self.lock().fail_processing = fail;
    }

    pub fn set_photo_size(&self, width: u32, height: u32) {
        self.lock().photo_size = (width, height);
    }

    pub fn journal(&self) -> Vec<JournalEntry> {
        self.lock().journal.clone()
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.lock().journal.iter().map(|e| e.call.clone()).collect()
    }

    pub fn clear_journal(&self) {
        self.lock().journal.clear();
    }

    /// Device id and time of every capture, in order.
    pub fn captures(&self) -> Vec<(String, Instant)> {
        self.lock()
            .journal
            .iter()
            .filter_map(|e| match &e.call {
                BackendCall::CapturePhoto { device, .. } => Some((device.clone(), e.at)),
                _ => None,
            })
            .collect()
    }

    pub fn capture_count(&self) -> usize {
        self.captures().len()
    }

    pub fn attached_ids(&self) -> Vec<String> {
        self.lock().attached.iter().map(|i| i.id().to_string()).collect()
    }

    pub fn is_configuring(&self) -> bool {
        self.lock().configuring
    }

    pub fn preset(&self) -> Option<SessionPreset> {
        self.lock().preset
    }
}

impl SimState {
    fn record(&mut self, call: BackendCall) {
        self.journal.push(JournalEntry {
            at: Instant::now(),
            call,
        });
    }
}

impl CaptureBackend for SimulatedBackend {
    fn devices(&mut self) -> Result<Vec<CaptureDevice>, CameraError> {
        let mut state = self.lock();
        state.record(BackendCall::Devices);
        Ok(state.devices.clone())
    }

    fn begin_configuration(&mut self) {
        let mut state = self.lock();
        state.configuring = true;
        state.record(BackendCall::BeginConfiguration);
    }

    fn commit_configuration(&mut self) -> Result<(), CameraError> {
        let mut state = self.lock();
        if !state.configuring {
            return Err(CameraError::Session(
                "commit without matching begin_configuration".to_string(),
            ));
        }
        state.configuring = false;
        state.record(BackendCall::CommitConfiguration);
        Ok(())
    }

    fn set_preset(&mut self, preset: SessionPreset) -> Result<(), CameraError> {
        let mut state = self.lock();
        state.preset = Some(preset);
        state.record(BackendCall::SetPreset(preset));
        Ok(())
    }

    fn can_add_input(&self, input: &DeviceInput) -> bool {
        let state = self.lock();
        !state.rejected.contains(input.id())
            && state.attached.is_empty()
            && state.devices.iter().any(|d| d.id == input.id())
    }

    fn add_input(&mut self, input: &DeviceInput) -> Result<(), CameraError> {
        if !self.can_add_input(input) {
            return Err(CameraError::Session(format!(
                "simulated session refused input {}",
                input.id()
            )));
        }
        let mut state = self.lock();
        state.attached.push(input.clone());
        state.record(BackendCall::AddInput(input.id().to_string()));
        Ok(())
    }

    fn remove_input(&mut self, input: &DeviceInput) {
        let mut state = self.lock();
        state.attached.retain(|attached| attached != input);
        state.record(BackendCall::RemoveInput(input.id().to_string()));
    }

    fn add_output(&mut self, output: PhotoOutputConfig) -> Result<(), CameraError> {
        let mut state = self.lock();
        if state.output.is_some() {
            return Err(CameraError::Session("photo output already attached".to_string()));
        }
        state.output = Some(output);
        state.record(BackendCall::AddOutput);
        Ok(())
    }

    fn start_running(&mut self) -> Result<(), CameraError> {
        let mut state = self.lock();
        state.running = true;
        state.record(BackendCall::StartRunning);
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.lock().running
    }

    fn capture_photo(
        &mut self,
        request: &CaptureRequest,
        events: &PhotoEventSender,
    ) -> Result<(), CameraError> {
        let (fail, (width, height)) = {
            let mut state = self.lock();
            if state.output.is_none() {
                return Err(CameraError::Session("no photo output attached".to_string()));
            }
            let device = state
                .attached
                .first()
                .map(|i| i.id().to_string())
                .ok_or_else(|| CameraError::Session("no input attached".to_string()))?;
            state.record(BackendCall::CapturePhoto {
                device,
                request_id: request.id,
            });
            (state.fail_processing, state.photo_size)
        };

        let encoded = if fail {
            Err(CameraError::CaptureProcessing("simulated sensor failure".to_string()))
        } else {
            synthetic_photo(request.role, width, height, request.settings.quality)
        };

        match encoded {
            Ok(bytes) => {
                events.processing_finished(PhotoResult::from_bytes(request.id, bytes));
                events.capture_finished(request.id, None);
            }
            Err(e) => {
                events.processing_finished(PhotoResult::failed(request.id, e.clone()));
                events.capture_finished(request.id, Some(e));
            }
        }
        Ok(())
    }
}
