use super::{CaptureSession, SessionState};
use crate::errors::CameraError;
use crate::event_log::EventLog;
use crate::platform::CaptureBackend;
use crate::registry::RoleInputs;
use crate::types::{ActiveRole, CameraRole, PhotoOutputConfig, SessionPreset};
use tokio::sync::watch;

impl<B: CaptureBackend> CaptureSession<B> {
    /// Configure and start the session.
    ///
    /// One transaction sets the photo preset, attaches the photo output and
    /// adds the input for `initial_role` if the backend accepts it. A missing
    /// or refused initial input is logged and the session runs without one.
    pub fn initialize(
        backend: B,
        inputs: RoleInputs,
        initial_role: CameraRole,
        role_tx: watch::Sender<ActiveRole>,
        log: EventLog,
    ) -> Result<Self, CameraError> {
        let initial = inputs.get(initial_role).cloned();
        let event_log = log.clone();
        let mut session = Self {
            backend,
            state: SessionState::Unconfigured,
            inputs,
            attached: Vec::new(),
            output: None,
            preset: None,
            role_tx,
            log,
        };

        let mut tx = session.begin_configuration();
        tx.set_preset(SessionPreset::Photo)?;
        tx.add_output(PhotoOutputConfig::default())?;
        match initial {
            Some(input) => {
                if let Err(e) = tx.add_input(&input) {
                    log::warn!("Initial {} input {} refused: {}", initial_role, input.id(), e);
                    event_log.record(CameraError::InputAddRejected(initial_role).to_string());
                }
            }
            None => log::warn!("No {} camera resolved; starting without an input", initial_role),
        }
        tx.commit()?;

        if session.output.is_none() {
            return Err(CameraError::Initialization(
                "photo output was not attached".to_string(),
            ));
        }

        session.backend.start_running()?;
        session.state = SessionState::Running;
        session.publish_role();
        log::info!("Capture session running, active camera: {}", session.active_role());
        Ok(session)
    }
}
