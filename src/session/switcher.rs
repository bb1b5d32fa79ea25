use super::CaptureSession;
use crate::errors::CameraError;
use crate::platform::CaptureBackend;
use crate::timing::Stopwatch;
use crate::types::{ActiveRole, CameraRole, DeviceInput};
use std::time::Duration;

/// What a switch request did to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum SwitchOutcome {
    /// The target input replaced the previous one.
    Switched {
        from: CameraRole,
        to: CameraRole,
        elapsed: Duration,
    },
    /// The previous input was removed but the target was refused; nothing is
    /// attached any more.
    Rejected {
        from: CameraRole,
        to: CameraRole,
        error: CameraError,
    },
    /// The requested role was already active.
    Unchanged(CameraRole),
    /// No active input with a usable position; the session was not touched.
    Indeterminate,
}

impl SwitchOutcome {
    /// Role active after the switch.
    pub fn active_role(&self) -> ActiveRole {
        match self {
            SwitchOutcome::Switched { to, .. } => Some(*to).into(),
            SwitchOutcome::Unchanged(role) => Some(*role).into(),
            SwitchOutcome::Rejected { .. } | SwitchOutcome::Indeterminate => ActiveRole::None,
        }
    }
}

impl<B: CaptureBackend> CaptureSession<B> {
    fn current(&self) -> Option<(DeviceInput, CameraRole)> {
        let input = self.active_input()?;
        match input.position().role() {
            Some(role) => Some((input.clone(), role)),
            None => {
                log::warn!(
                    "Active input {} reports no front/back position; not switching",
                    input.id()
                );
                None
            }
        }
    }

    /// Swap the active input for the one on the other side.
    pub fn switch_to_opposite(&mut self) -> SwitchOutcome {
        match self.current() {
            Some((input, role)) => self.swap(input, role, role.opposite()),
            None => {
                log::debug!("No active camera; switch skipped");
                SwitchOutcome::Indeterminate
            }
        }
    }

    /// Make `target` the active role, if it is not already.
    pub fn switch_to(&mut self, target: CameraRole) -> SwitchOutcome {
        match self.current() {
            Some((_, role)) if role == target => SwitchOutcome::Unchanged(role),
            Some((input, role)) => self.swap(input, role, target),
            None => SwitchOutcome::Indeterminate,
        }
    }

    fn swap(&mut self, current: DeviceInput, from: CameraRole, to: CameraRole) -> SwitchOutcome {
        self.log.record(format!("changing {} -> {}", from, to));
        let stopwatch = Stopwatch::start();
        let target = self.inputs.get(to).cloned();
        let log = self.log.clone();

        let mut tx = self.begin_configuration();
        tx.remove_input(&current);
        let added = match target {
            Some(input) => tx.add_input(&input),
            None => Err(CameraError::DeviceNotFound(to)),
        };
        if let Err(e) = &added {
            log::warn!("Switch {} -> {} failed: {}", from, to, e);
            log.record(CameraError::InputAddRejected(to).to_string());
        }
        if let Err(e) = tx.commit() {
            log::error!("Commit after switch {} -> {} failed: {}", from, to, e);
        }

        let elapsed = stopwatch.elapsed();
        self.log
            .record(format!("Changed camera -> {:.6}", elapsed.as_secs_f64()));
        self.publish_role();

        match added {
            Ok(()) => SwitchOutcome::Switched { from, to, elapsed },
            Err(error) => SwitchOutcome::Rejected { from, to, error },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_log::EventLog;
    use crate::registry::{DeviceRegistry, RoleInputs};
    use crate::testing::{BackendCall, SimulatedBackend};
    use crate::types::{CameraPosition, CaptureDevice};
    use tokio::sync::watch;

    fn session(backend: SimulatedBackend) -> CaptureSession<SimulatedBackend> {
        let log = EventLog::new();
        let mut discovery = backend.clone();
        let inputs = DeviceRegistry::default().resolve_all(&mut discovery, &log).unwrap();
        let (role_tx, _) = watch::channel(ActiveRole::None);
        CaptureSession::initialize(backend, inputs, CameraRole::Back, role_tx, log).unwrap()
    }

    #[test]
    fn test_switch_back_to_front_and_back_again() {
        let backend = SimulatedBackend::phone();
        let mut session = session(backend.clone());
        let roles = session.subscribe();

        let outcome = session.switch_to_opposite();
        assert!(matches!(
            outcome,
            SwitchOutcome::Switched {
                from: CameraRole::Back,
                to: CameraRole::Front,
                ..
            }
        ));
        assert_eq!(session.active_role(), ActiveRole::Front);
        assert_eq!(*roles.borrow(), ActiveRole::Front);

        session.switch_to_opposite();
        assert_eq!(session.active_role(), ActiveRole::Back);

        let log = session.log();
        assert_eq!(log.count_matching("changing back -> front"), 1);
        assert_eq!(log.count_matching("changing front -> back"), 1);
        assert_eq!(log.count_matching("Changed camera -> "), 2);
        assert_eq!(backend.attached_ids(), vec!["back".to_string()]);
    }

    #[test]
    fn test_remove_precedes_add_inside_one_bracket() {
        let backend = SimulatedBackend::phone();
        let mut session = session(backend.clone());
        backend.clear_journal();

        session.switch_to_opposite();
        assert_eq!(
            backend.calls(),
            vec![
                BackendCall::BeginConfiguration,
                BackendCall::RemoveInput("back".to_string()),
                BackendCall::AddInput("front".to_string()),
                BackendCall::CommitConfiguration,
            ]
        );
    }

    #[test]
    fn test_rejected_add_leaves_no_input() {
        let backend = SimulatedBackend::phone();
        backend.reject_input("front");
        let mut session = session(backend.clone());

        let outcome = session.switch_to_opposite();
        assert!(matches!(outcome, SwitchOutcome::Rejected { to: CameraRole::Front, .. }));
        assert_eq!(outcome.active_role(), ActiveRole::None);
        assert_eq!(session.active_role(), ActiveRole::None);
        assert!(session.log().contains("Could not add input for front camera"));
        assert!(backend.attached_ids().is_empty());
        // the back input is not re-added
        assert_eq!(
            backend
                .calls()
                .iter()
                .filter(|c| **c == BackendCall::AddInput("back".to_string()))
                .count(),
            1
        );

        backend.clear_journal();
        assert_eq!(session.switch_to_opposite(), SwitchOutcome::Indeterminate);
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn test_missing_target_device_is_rejected() {
        let backend = SimulatedBackend::new(vec![CaptureDevice::new(
            "back",
            "Back Camera",
            CameraPosition::Back,
        )]);
        let mut session = session(backend);
        let outcome = session.switch_to_opposite();
        assert!(matches!(
            outcome,
            SwitchOutcome::Rejected {
                error: CameraError::DeviceNotFound(CameraRole::Front),
                ..
            }
        ));
        assert!(session.log().contains("Could not add input for front camera"));
    }

    #[test]
    fn test_switch_to_same_role_is_unchanged() {
        let backend = SimulatedBackend::phone();
        let mut session = session(backend.clone());
        backend.clear_journal();

        assert_eq!(
            session.switch_to(CameraRole::Back),
            SwitchOutcome::Unchanged(CameraRole::Back)
        );
        assert!(backend.calls().is_empty());
        assert!(matches!(
            session.switch_to(CameraRole::Front),
            SwitchOutcome::Switched { to: CameraRole::Front, .. }
        ));
    }

    #[test]
    fn test_unspecified_position_is_indeterminate() {
        let odd = CaptureDevice::new("odd", "External Camera", CameraPosition::Unspecified);
        let backend = SimulatedBackend::new(vec![odd.clone()]);
        let mut inputs = RoleInputs::default();
        inputs.set(CameraRole::Back, DeviceInput::new(odd));
        let (role_tx, _) = watch::channel(ActiveRole::None);
        let mut session =
            CaptureSession::initialize(backend.clone(), inputs, CameraRole::Back, role_tx, EventLog::new())
                .unwrap();
        assert_eq!(backend.attached_ids(), vec!["odd".to_string()]);
        backend.clear_journal();

        assert_eq!(session.switch_to_opposite(), SwitchOutcome::Indeterminate);
        assert!(backend.calls().is_empty());
        assert_eq!(session.log().count_matching("changing"), 0);
        assert_eq!(backend.attached_ids(), vec!["odd".to_string()]);
    }
}
