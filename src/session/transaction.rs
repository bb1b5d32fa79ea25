use super::{CaptureSession, SessionState};
use crate::assert_invariant;
use crate::errors::CameraError;
use crate::platform::CaptureBackend;
use crate::types::{DeviceInput, PhotoOutputConfig, SessionPreset};

/// Begin/commit bracket around topology changes.
///
/// Changes made inside the bracket are applied together at commit. Dropping an
/// uncommitted transaction commits it, so every early return still leaves the
/// session committed.
pub struct ConfigurationTransaction<'a, B: CaptureBackend> {
    session: &'a mut CaptureSession<B>,
    committed: bool,
}

impl<'a, B: CaptureBackend> ConfigurationTransaction<'a, B> {
    pub(super) fn begin(session: &'a mut CaptureSession<B>) -> Self {
        session.backend.begin_configuration();
        Self {
            session,
            committed: false,
        }
    }

    pub fn set_preset(&mut self, preset: SessionPreset) -> Result<(), CameraError> {
        self.session.backend.set_preset(preset)?;
        self.session.preset = Some(preset);
        Ok(())
    }

    /// Backend capability check; an input already attached is never accepted twice.
    pub fn can_add_input(&self, input: &DeviceInput) -> bool {
        self.session.attached.is_empty() && self.session.backend.can_add_input(input)
    }

    pub fn add_input(&mut self, input: &DeviceInput) -> Result<(), CameraError> {
        if !self.can_add_input(input) {
            return Err(match input.position().role() {
                Some(role) => CameraError::InputAddRejected(role),
                None => CameraError::Session(format!("input {} was rejected", input.id())),
            });
        }
        self.session.backend.add_input(input)?;
        self.session.attached.push(input.clone());
        Ok(())
    }

    pub fn remove_input(&mut self, input: &DeviceInput) {
        let before = self.session.attached.len();
        self.session.attached.retain(|attached| attached != input);
        if self.session.attached.len() != before {
            self.session.backend.remove_input(input);
        }
    }

    pub fn add_output(&mut self, output: PhotoOutputConfig) -> Result<(), CameraError> {
        if self.session.output.is_some() {
            return Err(CameraError::Session(
                "photo output already attached".to_string(),
            ));
        }
        self.session.backend.add_output(output)?;
        self.session.output = Some(output);
        Ok(())
    }

    pub fn commit(mut self) -> Result<(), CameraError> {
        self.finish()
    }

    fn finish(&mut self) -> Result<(), CameraError> {
        if self.committed {
            return Ok(());
        }
        self.committed = true;

        assert_invariant!(
            self.session.attached.len() <= 1,
            "Session has at most one video input",
            "session::transaction"
        );
        assert_invariant!(
            self.session.state != SessionState::Running || self.session.output.is_some(),
            "Running session has exactly one photo output",
            "session::transaction"
        );

        self.session.backend.commit_configuration()
    }
}

impl<B: CaptureBackend> Drop for ConfigurationTransaction<'_, B> {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            log::error!("Failed to commit session configuration: {}", e);
        }
    }
}
