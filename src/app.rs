//! Application controller: the control surface a UI binds to.
//!
//! Owns the completion bridge and the sequencer (which owns the session
//! worker). When camera access is denied or setup fails the controller is
//! built inert: every action is logged and otherwise ignored.

use crate::completion::{CompletionHandler, CompletionStats};
use crate::config::DualCamConfig;
use crate::errors::CameraError;
use crate::event_log::EventLog;
use crate::library::PhotoLibrary;
use crate::permissions::{request_access, AccessAuthority, AccessKind};
use crate::platform::CaptureBackend;
use crate::registry::DeviceRegistry;
use crate::sequencer::{CaptureSequencer, SessionWorker, SettleDelays};
use crate::session::CaptureSession;
use crate::types::{ActiveRole, PhotoSettings, SequencePlan};
use std::sync::Arc;
use tokio::sync::watch;

// Field order matters: the sequencer drains its queue into the completion
// channel when dropped, so it has to go first.
struct Pipeline<B: CaptureBackend + 'static> {
    sequencer: CaptureSequencer<B>,
    completion: CompletionHandler,
}

pub struct DualCamApp<B: CaptureBackend + 'static> {
    pipeline: Option<Pipeline<B>>,
    log: EventLog,
    roles: watch::Receiver<ActiveRole>,
    config: DualCamConfig,
}

/// Repeat count typed by the user. Anything that is not a non-negative
/// integer counts as zero.
pub fn parse_repeat_count(text: &str) -> usize {
    text.trim().parse::<usize>().unwrap_or(0)
}

impl<B: CaptureBackend + 'static> DualCamApp<B> {
    /// Request camera access, then build the session on its worker.
    ///
    /// Only an invalid configuration is an error; access or setup failures
    /// produce an inert controller.
    pub async fn launch<F>(
        config: DualCamConfig,
        authority: Arc<dyn AccessAuthority>,
        library: Arc<dyn PhotoLibrary>,
        backend_factory: F,
    ) -> Result<Self, CameraError>
    where
        F: FnOnce() -> Result<B, CameraError> + Send + 'static,
    {
        config.validate().map_err(CameraError::Config)?;

        let log = EventLog::new();
        let (role_tx, roles) = watch::channel(ActiveRole::None);

        let access = request_access(authority.clone(), AccessKind::Camera).await;
        if !access.status.is_granted() {
            log.record(CameraError::AuthorizationDenied(AccessKind::Camera).to_string());
            return Ok(Self::inert(config, log, roles));
        }

        let pipeline = match Self::build(&config, library, authority, log.clone(), role_tx, backend_factory).await
        {
            Ok(pipeline) => pipeline,
            Err(e) => {
                log::error!("Camera setup failed: {}", e);
                log.record(format!("Camera setup failed: {}", e));
                return Ok(Self::inert(config, log, roles));
            }
        };

        Ok(Self {
            pipeline: Some(pipeline),
            log,
            roles,
            config,
        })
    }

    async fn build<F>(
        config: &DualCamConfig,
        library: Arc<dyn PhotoLibrary>,
        authority: Arc<dyn AccessAuthority>,
        log: EventLog,
        role_tx: watch::Sender<ActiveRole>,
        backend_factory: F,
    ) -> Result<Pipeline<B>, CameraError>
    where
        F: FnOnce() -> Result<B, CameraError> + Send + 'static,
    {
        let completion = CompletionHandler::spawn(library, authority, log.clone())?;

        let registry = DeviceRegistry::new(config.camera.device_types.clone());
        let initial_role = config.camera.initial_role;
        let worker_log = log.clone();
        let worker = tokio::task::spawn_blocking(move || {
            SessionWorker::spawn(move || {
                let mut backend = backend_factory()?;
                let inputs = registry.resolve_all(&mut backend, &worker_log)?;
                CaptureSession::initialize(backend, inputs, initial_role, role_tx, worker_log)
            })
        })
        .await
        .map_err(|e| CameraError::Initialization(format!("Session setup task failed: {}", e)))??;

        let settings = PhotoSettings {
            quality: config.storage.jpeg_quality,
            ..PhotoSettings::default()
        };
        let sequencer = CaptureSequencer::new(
            worker,
            completion.sender(),
            SettleDelays::from_config(&config.sequence),
            config.sequence.capture_enabled,
            log,
        )
        .with_settings(settings);

        Ok(Pipeline {
            sequencer,
            completion,
        })
    }

    fn inert(config: DualCamConfig, log: EventLog, roles: watch::Receiver<ActiveRole>) -> Self {
        log::warn!("Camera pipeline unavailable; controls are disabled");
        Self {
            pipeline: None,
            log,
            roles,
            config,
        }
    }

    fn unavailable(&self, action: &str) {
        self.log.record(format!("Camera unavailable: {} ignored", action));
    }

    pub fn is_ready(&self) -> bool {
        self.pipeline.is_some()
    }

    pub fn config(&self) -> &DualCamConfig {
        &self.config
    }

    /// Whether the capture button should be enabled for this input text.
    pub fn repeat_input_changed(&self, text: &str) -> bool {
        !text.is_empty()
    }

    /// Queue the switch units for the typed repeat count.
    pub fn capture_pressed(&self, text: &str) -> SequencePlan {
        self.log.record("Capture button pressed");
        let repeat_count = parse_repeat_count(text);
        match &self.pipeline {
            Some(pipeline) => pipeline.sequencer.run(repeat_count),
            None => {
                self.unavailable("capture");
                SequencePlan::new(0)
            }
        }
    }

    pub fn set_capture_enabled(&self, enabled: bool) {
        match &self.pipeline {
            Some(pipeline) => pipeline.sequencer.set_capture_enabled(enabled),
            None => self.unavailable("capture toggle"),
        }
    }

    pub fn capture_enabled(&self) -> bool {
        self.pipeline
            .as_ref()
            .is_some_and(|p| p.sequencer.capture_enabled())
    }

    pub fn clear_log(&self) {
        self.log.clear();
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn log_lines(&self) -> Vec<String> {
        self.log.lines()
    }

    /// Last published role. Never waits on the session.
    pub fn active_role(&self) -> ActiveRole {
        *self.roles.borrow()
    }

    pub fn subscribe_role(&self) -> watch::Receiver<ActiveRole> {
        self.roles.clone()
    }

    /// Block until queued units have run and their photos have been handled.
    pub fn wait_idle(&self) {
        if let Some(pipeline) = &self.pipeline {
            pipeline.sequencer.wait_idle();
            pipeline.completion.flush();
        }
    }

    pub fn stats(&self) -> CompletionStats {
        self.pipeline
            .as_ref()
            .map(|p| p.completion.stats())
            .unwrap_or_default()
    }

    /// Run `f` against the session on its worker.
    pub fn with_session<R, F>(&self, f: F) -> Result<R, CameraError>
    where
        R: Send + 'static,
        F: FnOnce(&mut CaptureSession<B>) -> R + Send + 'static,
    {
        match &self.pipeline {
            Some(pipeline) => pipeline.sequencer.worker().query(f),
            None => Err(CameraError::Session("camera pipeline unavailable".to_string())),
        }
    }
}
