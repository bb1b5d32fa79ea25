//! Monotonic timing for switch and capture latency reporting.

use std::time::{Duration, Instant};

/// Measures how long a switch or capture step took.
///
/// Readings come from a monotonic clock, so they never go backwards even if
/// the wall clock is adjusted while a sequence runs.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    start: Instant,
}

impl Stopwatch {
    /// Start measuring now
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}
