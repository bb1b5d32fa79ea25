//! Photo completion bridge.
//!
//! Backends report each capture as two events: processing finished (bytes or
//! error) followed by capture finished. A dedicated thread consumes them, keeps
//! the most recent bytes in a single slot and persists them once the capture
//! finishes. Nothing here ever runs on the session worker.

use crate::errors::CameraError;
use crate::event_log::EventLog;
use crate::library::PhotoLibrary;
use crate::permissions::{AccessAuthority, AccessKind};
use crate::types::PhotoResult;
use bytes::Bytes;
use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub enum PhotoEvent {
    ProcessingFinished(PhotoResult),
    CaptureFinished {
        request_id: Uuid,
        error: Option<CameraError>,
    },
}

enum Message {
    Event(PhotoEvent),
    Flush(Sender<()>),
    Shutdown,
}

/// Cloneable handle backends use to report capture progress.
#[derive(Clone)]
pub struct PhotoEventSender {
    tx: Sender<Message>,
}

impl PhotoEventSender {
    pub fn send(&self, event: PhotoEvent) {
        if self.tx.send(Message::Event(event)).is_err() {
            log::warn!("Completion handler is gone; dropping photo event");
        }
    }

    pub fn processing_finished(&self, result: PhotoResult) {
        self.send(PhotoEvent::ProcessingFinished(result));
    }

    pub fn capture_finished(&self, request_id: Uuid, error: Option<CameraError>) {
        self.send(PhotoEvent::CaptureFinished { request_id, error });
    }
}

/// Counters kept by the completion thread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CompletionStats {
    /// Processing events that carried bytes
    pub processed: u64,
    /// Processing or capture errors
    pub failed: u64,
    /// Photos written to the library
    pub saved: u64,
    /// Photos dropped because library access was denied
    pub dropped: u64,
    /// Captures that finished with nothing in the slot
    pub missing: u64,
}

#[derive(Default)]
struct Counters {
    processed: AtomicU64,
    failed: AtomicU64,
    saved: AtomicU64,
    dropped: AtomicU64,
    missing: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> CompletionStats {
        CompletionStats {
            processed: self.processed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            saved: self.saved.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            missing: self.missing.load(Ordering::Relaxed),
        }
    }
}

pub struct CompletionHandler {
    sender: PhotoEventSender,
    counters: Arc<Counters>,
    thread: Option<JoinHandle<()>>,
}

impl CompletionHandler {
    /// Start the completion thread. Photo-library access is asked of
    /// `authority` for every finished capture, before anything is written.
    pub fn spawn(
        library: Arc<dyn PhotoLibrary>,
        authority: Arc<dyn AccessAuthority>,
        log: EventLog,
    ) -> Result<Self, CameraError> {
        let (tx, rx) = unbounded();
        let counters = Arc::new(Counters::default());

        let worker_counters = counters.clone();
        let thread = std::thread::Builder::new()
            .name("dualcam-completion".to_string())
            .spawn(move || completion_loop(rx, library, authority, log, worker_counters))
            .map_err(|e| CameraError::Initialization(format!("spawn failed: {e}")))?;

        Ok(Self {
            sender: PhotoEventSender { tx },
            counters,
            thread: Some(thread),
        })
    }

    pub fn sender(&self) -> PhotoEventSender {
        self.sender.clone()
    }

    /// Block until every event queued before this call has been handled.
    pub fn flush(&self) {
        let (done_tx, done_rx) = crossbeam_channel::bounded(1);
        if self.sender.tx.send(Message::Flush(done_tx)).is_ok() {
            let _ = done_rx.recv();
        }
    }

    pub fn stats(&self) -> CompletionStats {
        self.counters.snapshot()
    }
}

impl Drop for CompletionHandler {
    fn drop(&mut self) {
        let _ = self.sender.tx.send(Message::Shutdown);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

/// Most recent processed photo; captures are serialized so at most one is pending.
struct PhotoSlot {
    request_id: Uuid,
    data: Bytes,
}

fn completion_loop(
    rx: Receiver<Message>,
    library: Arc<dyn PhotoLibrary>,
    authority: Arc<dyn AccessAuthority>,
    log: EventLog,
    counters: Arc<Counters>,
) {
    let mut slot: Option<PhotoSlot> = None;

    for message in rx {
        match message {
            Message::Event(PhotoEvent::ProcessingFinished(result)) => {
                log.record("PhotoOutput didFinishProcessingPhoto");
                match result.data {
                    Ok(data) => {
                        counters.processed.fetch_add(1, Ordering::Relaxed);
                        slot = Some(PhotoSlot {
                            request_id: result.request_id,
                            data,
                        });
                    }
                    Err(e) => {
                        counters.failed.fetch_add(1, Ordering::Relaxed);
                        log.record(format!("Error capturing photo: {}", e));
                        slot = None;
                    }
                }
            }
            Message::Event(PhotoEvent::CaptureFinished {
                request_id,
                error: Some(e),
            }) => {
                log::error!("Capture {} finished with error: {}", request_id, e);
                slot = None;
            }
            Message::Event(PhotoEvent::CaptureFinished {
                request_id,
                error: None,
            }) => {
                let Some(photo) = slot.take() else {
                    counters.missing.fetch_add(1, Ordering::Relaxed);
                    log::warn!("No photo data for capture {}", request_id);
                    log.record("No photo data resource");
                    continue;
                };
                if photo.request_id != request_id {
                    log::warn!(
                        "Capture {} finished but slot holds {}; saving latest data",
                        request_id,
                        photo.request_id
                    );
                }
                persist(library.as_ref(), authority.as_ref(), &photo.data, &log, &counters);
            }
            Message::Flush(done) => {
                let _ = done.send(());
            }
            Message::Shutdown => break,
        }
    }
}

fn persist(
    library: &dyn PhotoLibrary,
    authority: &dyn AccessAuthority,
    data: &Bytes,
    log: &EventLog,
    counters: &Counters,
) {
    let access = authority.check(AccessKind::PhotoLibrary);
    if !access.status.is_granted() {
        counters.dropped.fetch_add(1, Ordering::Relaxed);
        log::debug!("{}; dropping {} bytes", access.message, data.len());
        return;
    }

    match library.save(data) {
        Ok(saved) => {
            counters.saved.fetch_add(1, Ordering::Relaxed);
            log::info!("Saved photo {} ({} bytes)", saved.location, saved.bytes);
        }
        Err(e) => {
            counters.failed.fetch_add(1, Ordering::Relaxed);
            log.record(format!("Error occurred while saving photo to photo library: {}", e));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::PermissionStatus;
    use crate::testing::{MemoryLibrary, StaticAccess};

    fn handler(photo_access: PermissionStatus) -> (CompletionHandler, MemoryLibrary, EventLog) {
        let library = MemoryLibrary::new();
        let log = EventLog::new();
        let handler = CompletionHandler::spawn(
            Arc::new(library.clone()),
            Arc::new(StaticAccess::photo_library(photo_access)),
            log.clone(),
        )
        .unwrap();
        (handler, library, log)
    }

    #[test]
    fn test_successful_capture_is_saved_once() {
        let (handler, library, log) = handler(PermissionStatus::Granted);
        let events = handler.sender();
        let id = Uuid::new_v4();

        events.processing_finished(PhotoResult::from_bytes(id, vec![1, 2, 3]));
        events.capture_finished(id, None);
        // a second finish for the same capture finds the slot empty
        events.capture_finished(id, None);
        handler.flush();

        assert_eq!(library.photos(), vec![Bytes::from_static(&[1, 2, 3])]);
        let stats = handler.stats();
        assert_eq!(stats.saved, 1);
        assert_eq!(stats.missing, 1);
        assert!(log.contains("didFinishProcessingPhoto"));
    }

    #[test]
    fn test_processing_error_is_never_persisted() {
        let (handler, library, log) = handler(PermissionStatus::Granted);
        let events = handler.sender();
        let id = Uuid::new_v4();

        events.processing_finished(PhotoResult::failed(
            id,
            CameraError::CaptureProcessing("sensor timeout".to_string()),
        ));
        events.capture_finished(id, None);
        handler.flush();

        assert!(library.photos().is_empty());
        assert_eq!(handler.stats().failed, 1);
        assert!(log.contains("Error capturing photo: Capture processing error: sensor timeout"));
    }

    #[test]
    fn test_capture_error_clears_slot() {
        let (handler, library, _log) = handler(PermissionStatus::Granted);
        let events = handler.sender();
        let id = Uuid::new_v4();

        events.processing_finished(PhotoResult::from_bytes(id, vec![9; 4]));
        events.capture_finished(id, Some(CameraError::CaptureProcessing("late".into())));
        handler.flush();

        assert!(library.photos().is_empty());
    }

    #[test]
    fn test_denied_library_drops_photo() {
        let (handler, library, _log) = handler(PermissionStatus::Denied);
        let events = handler.sender();
        let id = Uuid::new_v4();

        events.processing_finished(PhotoResult::from_bytes(id, vec![7; 8]));
        events.capture_finished(id, None);
        handler.flush();

        assert!(library.photos().is_empty());
        assert_eq!(handler.stats().dropped, 1);
        assert_eq!(handler.stats().saved, 0);
    }

    #[test]
    fn test_undetermined_library_access_drops_photo() {
        let (handler, library, _log) = handler(PermissionStatus::NotDetermined);
        let events = handler.sender();
        let id = Uuid::new_v4();

        events.processing_finished(PhotoResult::from_bytes(id, vec![5; 2]));
        events.capture_finished(id, None);
        handler.flush();

        assert!(library.photos().is_empty());
        assert_eq!(handler.stats().dropped, 1);
    }

    #[test]
    fn test_last_write_wins() {
        let (handler, library, _log) = handler(PermissionStatus::Granted);
        let events = handler.sender();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        events.processing_finished(PhotoResult::from_bytes(first, vec![1]));
        events.processing_finished(PhotoResult::from_bytes(second, vec![2]));
        events.capture_finished(first, None);
        handler.flush();

        assert_eq!(library.photos(), vec![Bytes::from_static(&[2])]);
    }
}
