//! Serial execution of switch/settle/capture units.
//!
//! The session lives on one worker thread. Every unit is a boxed job run
//! against it in FIFO order, so switches and captures never overlap.

use crate::completion::PhotoEventSender;
use crate::config::SequenceConfig;
use crate::errors::CameraError;
use crate::event_log::EventLog;
use crate::platform::CaptureBackend;
use crate::session::{CaptureSession, SwitchOutcome};
use crate::types::{CameraRole, PhotoSettings, SequencePlan};
use crossbeam_channel::{bounded, unbounded, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Wait after a switch before capturing, per post-switch role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettleDelays {
    pub front: Duration,
    pub back: Duration,
}

impl Default for SettleDelays {
    fn default() -> Self {
        Self {
            front: Duration::from_millis(30),
            back: Duration::from_millis(100),
        }
    }
}

impl SettleDelays {
    pub fn from_config(config: &SequenceConfig) -> Self {
        let (front, back) = config.settle_delays();
        Self { front, back }
    }

    pub fn for_role(&self, role: CameraRole) -> Duration {
        match role {
            CameraRole::Front => self.front,
            CameraRole::Back => self.back,
        }
    }
}

/// Default settle delay for a role: 30 ms front, 100 ms back.
pub fn settle_delay(role: CameraRole) -> Duration {
    SettleDelays::default().for_role(role)
}

type Job<B> = Box<dyn FnOnce(&mut CaptureSession<B>) + Send>;

enum WorkerMessage<B: CaptureBackend> {
    Run(Job<B>),
    Barrier(Sender<()>),
}

/// Named thread that owns the capture session and runs jobs against it.
pub struct SessionWorker<B: CaptureBackend + 'static> {
    tx: Option<Sender<WorkerMessage<B>>>,
    thread: Option<JoinHandle<()>>,
}

impl<B: CaptureBackend + 'static> SessionWorker<B> {
    /// Build the session on a new worker thread.
    ///
    /// The backend does not need to be `Send`: `factory` runs on the worker
    /// and the session never leaves it. Returns once setup has finished.
    pub fn spawn<F>(factory: F) -> Result<Self, CameraError>
    where
        F: FnOnce() -> Result<CaptureSession<B>, CameraError> + Send + 'static,
    {
        let (tx, rx) = unbounded::<WorkerMessage<B>>();
        let (ready_tx, ready_rx) = bounded::<Result<(), CameraError>>(1);

        let thread = std::thread::Builder::new()
            .name("dualcam-session".to_string())
            .spawn(move || {
                let mut session = match factory() {
                    Ok(session) => {
                        let _ = ready_tx.send(Ok(()));
                        session
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                for message in rx {
                    match message {
                        WorkerMessage::Run(job) => job(&mut session),
                        WorkerMessage::Barrier(done) => {
                            let _ = done.send(());
                        }
                    }
                }
                log::debug!("Session worker stopped");
            })
            .map_err(|e| CameraError::Initialization(format!("Failed to spawn session worker: {}", e)))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                tx: Some(tx),
                thread: Some(thread),
            }),
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(CameraError::Initialization(
                    "session worker exited during setup".to_string(),
                ))
            }
        }
    }

    /// Queue a job behind everything already submitted.
    pub fn submit<F>(&self, job: F) -> Result<(), CameraError>
    where
        F: FnOnce(&mut CaptureSession<B>) + Send + 'static,
    {
        self.tx
            .as_ref()
            .ok_or_else(stopped)?
            .send(WorkerMessage::Run(Box::new(job)))
            .map_err(|_| stopped())
    }

    /// Run `f` on the worker and wait for its result.
    pub fn query<R, F>(&self, f: F) -> Result<R, CameraError>
    where
        R: Send + 'static,
        F: FnOnce(&mut CaptureSession<B>) -> R + Send + 'static,
    {
        let (result_tx, result_rx) = bounded(1);
        self.submit(move |session| {
            let _ = result_tx.send(f(session));
        })?;
        result_rx.recv().map_err(|_| stopped())
    }

    /// Block until every job submitted before this call has run.
    pub fn wait_idle(&self) {
        let Some(tx) = self.tx.as_ref() else {
            return;
        };
        let (done_tx, done_rx) = bounded(1);
        if tx.send(WorkerMessage::Barrier(done_tx)).is_ok() {
            let _ = done_rx.recv();
        }
    }
}

fn stopped() -> CameraError {
    CameraError::Session("session worker has stopped".to_string())
}

impl<B: CaptureBackend + 'static> Drop for SessionWorker<B> {
    fn drop(&mut self) {
        // closing the queue lets the worker drain what is left and exit
        self.tx.take();
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                log::error!("Session worker panicked");
            }
        }
    }
}

/// Turns repeat counts into queued switch units.
pub struct CaptureSequencer<B: CaptureBackend + 'static> {
    worker: SessionWorker<B>,
    events: PhotoEventSender,
    capture_enabled: Arc<AtomicBool>,
    delays: SettleDelays,
    settings: PhotoSettings,
    log: EventLog,
}

impl<B: CaptureBackend + 'static> CaptureSequencer<B> {
    pub fn new(
        worker: SessionWorker<B>,
        events: PhotoEventSender,
        delays: SettleDelays,
        capture_enabled: bool,
        log: EventLog,
    ) -> Self {
        Self {
            worker,
            events,
            capture_enabled: Arc::new(AtomicBool::new(capture_enabled)),
            delays,
            settings: PhotoSettings::default(),
            log,
        }
    }

    pub fn with_settings(mut self, settings: PhotoSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn worker(&self) -> &SessionWorker<B> {
        &self.worker
    }

    pub fn delays(&self) -> SettleDelays {
        self.delays
    }

    pub fn capture_enabled(&self) -> bool {
        self.capture_enabled.load(Ordering::SeqCst)
    }

    /// Takes effect for every unit that has not started yet.
    pub fn set_capture_enabled(&self, enabled: bool) {
        self.capture_enabled.store(enabled, Ordering::SeqCst);
        log::debug!("Capture after switch {}", if enabled { "enabled" } else { "disabled" });
    }

    /// Queue `2 * repeat_count` switch units and return immediately.
    pub fn run(&self, repeat_count: usize) -> SequencePlan {
        let plan = SequencePlan::new(repeat_count);
        log::info!(
            "Queueing {} switch units for {} round trips",
            plan.units,
            plan.repeat_count
        );

        for index in 0..plan.units {
            let unit = SwitchUnit {
                index,
                capture_enabled: self.capture_enabled.clone(),
                delays: self.delays,
                settings: self.settings,
                events: self.events.clone(),
                log: self.log.clone(),
            };
            if let Err(e) = self.worker.submit(move |session| unit.execute(session)) {
                log::error!("Failed to queue switch unit {}: {}", index, e);
                break;
            }
        }
        plan
    }

    pub fn wait_idle(&self) {
        self.worker.wait_idle();
    }
}

struct SwitchUnit {
    index: usize,
    capture_enabled: Arc<AtomicBool>,
    delays: SettleDelays,
    settings: PhotoSettings,
    events: PhotoEventSender,
    log: EventLog,
}

impl SwitchUnit {
    fn execute<B: CaptureBackend>(self, session: &mut CaptureSession<B>) {
        let outcome = session.switch_to_opposite();
        if outcome == SwitchOutcome::Indeterminate {
            log::debug!("Unit {}: no active camera to switch from", self.index);
        }

        if !self.capture_enabled.load(Ordering::SeqCst) {
            return;
        }

        let Some(role) = session.active_role().role() else {
            self.log.record("Skipping capture: no active camera");
            return;
        };

        std::thread::sleep(self.delays.for_role(role));
        match session.capture_photo(self.settings, &self.events) {
            Ok(id) => log::debug!("Unit {}: capture {} issued on {} camera", self.index, id, role),
            Err(e) => self.log.record(format!("Error capturing photo: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settle_delays() {
        assert_eq!(settle_delay(CameraRole::Front), Duration::from_millis(30));
        assert_eq!(settle_delay(CameraRole::Back), Duration::from_millis(100));
    }

    #[test]
    fn test_delays_from_config() {
        let config = SequenceConfig {
            front_settle_ms: 5,
            back_settle_ms: 7,
            ..SequenceConfig::default()
        };
        let delays = SettleDelays::from_config(&config);
        assert_eq!(delays.for_role(CameraRole::Front), Duration::from_millis(5));
        assert_eq!(delays.for_role(CameraRole::Back), Duration::from_millis(7));
    }
}
