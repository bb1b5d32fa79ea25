//! Device discovery and role resolution.

use crate::errors::CameraError;
use crate::event_log::EventLog;
use crate::platform::CaptureBackend;
use crate::types::{CameraRole, CaptureDevice, DeviceInput, DeviceType, MediaType};

/// The inputs resolved at setup, one slot per role.
///
/// A role whose device was not found stays `None` for the life of the session.
#[derive(Debug, Clone, Default)]
pub struct RoleInputs {
    pub front: Option<DeviceInput>,
    pub back: Option<DeviceInput>,
}

impl RoleInputs {
    pub fn get(&self, role: CameraRole) -> Option<&DeviceInput> {
        match role {
            CameraRole::Front => self.front.as_ref(),
            CameraRole::Back => self.back.as_ref(),
        }
    }

    pub fn set(&mut self, role: CameraRole, input: DeviceInput) {
        match role {
            CameraRole::Front => self.front = Some(input),
            CameraRole::Back => self.back = Some(input),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeviceRegistry {
    device_types: Vec<DeviceType>,
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new(DeviceType::discovery_defaults())
    }
}

impl DeviceRegistry {
    pub fn new(device_types: Vec<DeviceType>) -> Self {
        Self { device_types }
    }

    /// Video devices of an accepted type, in backend enumeration order.
    pub fn discover<B: CaptureBackend + ?Sized>(
        &self,
        backend: &mut B,
    ) -> Result<Vec<CaptureDevice>, CameraError> {
        let devices = backend.devices()?;
        let total = devices.len();
        let accepted: Vec<CaptureDevice> = devices
            .into_iter()
            .filter(|d| self.device_types.contains(&d.device_type) && d.provides(MediaType::Video))
            .collect();
        log::debug!("Discovered {} devices, {} usable", total, accepted.len());
        Ok(accepted)
    }

    /// First discovered device whose position matches `role`.
    pub fn resolve_device(
        &self,
        devices: &[CaptureDevice],
        role: CameraRole,
    ) -> Result<DeviceInput, CameraError> {
        devices
            .iter()
            .find(|d| {
                d.position.role() == Some(role)
                    && self.device_types.contains(&d.device_type)
                    && d.provides(MediaType::Video)
            })
            .cloned()
            .map(DeviceInput::new)
            .ok_or(CameraError::DeviceNotFound(role))
    }

    /// Resolve both roles. A missing role is logged and left empty.
    ///
    /// Only a failure to enumerate devices at all is returned as an error.
    pub fn resolve_all<B: CaptureBackend + ?Sized>(
        &self,
        backend: &mut B,
        log: &EventLog,
    ) -> Result<RoleInputs, CameraError> {
        let devices = self.discover(backend)?;
        let mut inputs = RoleInputs::default();

        for role in CameraRole::ALL {
            match self.resolve_device(&devices, role) {
                Ok(input) => {
                    log::info!("Resolved {} camera: {}", role, input.device());
                    inputs.set(role, input);
                }
                Err(e) => {
                    log::warn!("{}; {} camera will be unusable", e, role);
                    log.record(format!("Warning: {}", e));
                }
            }
        }

        Ok(inputs)
    }
}
