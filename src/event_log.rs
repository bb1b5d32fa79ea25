//! Timestamped, clearable event log shown to the user.
//!
//! Every entry is also forwarded to the `log` facade so it shows up in the
//! process log. Writers may be on any thread; readers get a snapshot.

use chrono::{DateTime, Timelike, Utc};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

impl LogEntry {
    /// `H:M:SS.ffff message`, UTC, four fractional digits.
    pub fn formatted(&self) -> String {
        let fraction = self.timestamp.nanosecond() % 1_000_000_000 / 100_000;
        format!(
            "{}.{:04} {}",
            self.timestamp.format("%-H:%-M:%S"),
            fraction,
            self.message
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct EventLog {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> MutexGuard<'_, Vec<LogEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn record(&self, message: impl Into<String>) {
        let entry = LogEntry {
            timestamp: Utc::now(),
            message: message.into(),
        };
        log::info!("{}", entry.formatted());
        self.guard().push(entry);
    }

    /// Drop all entries. Units still in flight keep appending afterwards.
    pub fn clear(&self) {
        self.guard().clear();
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.guard().clone()
    }

    pub fn lines(&self) -> Vec<String> {
        self.guard().iter().map(LogEntry::formatted).collect()
    }

    pub fn len(&self) -> usize {
        self.guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }

    /// Number of entries whose message contains `needle`.
    pub fn count_matching(&self, needle: &str) -> usize {
        self.guard()
            .iter()
            .filter(|e| e.message.contains(needle))
            .count()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.count_matching(needle) > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_formatted_timestamp() {
        let timestamp = Utc
            .with_ymd_and_hms(2024, 1, 25, 9, 5, 7)
            .unwrap()
            .with_nanosecond(123_456_789)
            .unwrap();
        let entry = LogEntry {
            timestamp,
            message: "Capture button pressed".to_string(),
        };
        assert_eq!(entry.formatted(), "9:5:07.1234 Capture button pressed");
    }

    #[test]
    fn test_record_and_clear() {
        let log = EventLog::new();
        log.record("changing back -> front");
        log.record("Changed camera -> 0.01");
        assert_eq!(log.len(), 2);
        assert_eq!(log.count_matching("chang"), 1);
        assert!(log.contains("Changed camera"));

        log.clear();
        assert!(log.is_empty());
        log.record("after clear");
        assert_eq!(log.lines().len(), 1);
    }

    #[test]
    fn test_clones_share_entries() {
        let log = EventLog::new();
        let writer = log.clone();
        std::thread::spawn(move || writer.record("from worker"))
            .join()
            .unwrap();
        assert!(log.contains("from worker"));
    }
}
