//! The single capture session and everything allowed to mutate it.
//!
//! A [`CaptureSession`] owns its backend and lives on the session worker for
//! its whole life. Topology changes (inputs, outputs, preset) are only
//! reachable through a [`ConfigurationTransaction`].

mod configurator;
mod switcher;
mod transaction;

pub use switcher::SwitchOutcome;
pub use transaction::ConfigurationTransaction;

use crate::completion::PhotoEventSender;
use crate::errors::CameraError;
use crate::event_log::EventLog;
use crate::platform::CaptureBackend;
use crate::registry::RoleInputs;
use crate::types::{
    ActiveRole, CaptureRequest, DeviceInput, PhotoOutputConfig, PhotoSettings, SessionPreset,
};
use tokio::sync::watch;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unconfigured,
    Running,
}

pub struct CaptureSession<B: CaptureBackend> {
    backend: B,
    state: SessionState,
    inputs: RoleInputs,
    attached: Vec<DeviceInput>,
    output: Option<PhotoOutputConfig>,
    preset: Option<SessionPreset>,
    role_tx: watch::Sender<ActiveRole>,
    log: EventLog,
}

impl<B: CaptureBackend> CaptureSession<B> {
    /// Open a configuration bracket. It commits when dropped.
    pub fn begin_configuration(&mut self) -> ConfigurationTransaction<'_, B> {
        ConfigurationTransaction::begin(self)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn inputs(&self) -> &RoleInputs {
        &self.inputs
    }

    pub fn preset(&self) -> Option<SessionPreset> {
        self.preset
    }

    pub fn output(&self) -> Option<PhotoOutputConfig> {
        self.output
    }

    pub fn active_input(&self) -> Option<&DeviceInput> {
        self.attached.first()
    }

    /// Role of the attached input; `None` when nothing is attached or the
    /// attached device reports no usable position.
    pub fn active_role(&self) -> ActiveRole {
        self.active_input()
            .and_then(|input| input.position().role())
            .into()
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn subscribe(&self) -> watch::Receiver<ActiveRole> {
        self.role_tx.subscribe()
    }

    fn publish_role(&self) {
        let role = self.active_role();
        let previous = self.role_tx.send_replace(role);
        if previous != role {
            log::debug!("Active camera role {} -> {}", previous, role);
        }
    }

    /// Issue one still capture from the active input.
    ///
    /// Results arrive on `events`; the returned id tags them.
    pub fn capture_photo(
        &mut self,
        settings: PhotoSettings,
        events: &PhotoEventSender,
    ) -> Result<Uuid, CameraError> {
        if self.state != SessionState::Running {
            return Err(CameraError::Session("session is not running".to_string()));
        }
        let role = self
            .active_role()
            .role()
            .ok_or_else(|| CameraError::Session("no active camera to capture from".to_string()))?;

        let request = CaptureRequest::new(role, settings);
        self.backend.capture_photo(&request, events)?;
        log::debug!("Issued capture {} on {} camera", request.id, role);
        Ok(request.id)
    }
}

impl<B: CaptureBackend> Drop for CaptureSession<B> {
    fn drop(&mut self) {
        for input in self.attached.drain(..) {
            self.backend.remove_input(&input);
        }
        log::debug!("Capture session torn down");
    }
}
