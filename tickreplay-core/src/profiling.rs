//! Timing scopes for the `timers` diagnostics toggle.
//!
//! ```
//! use tickreplay_core::profiling::ProfileScope;
//!
//! fn expensive_operation() {
//!     let _scope = ProfileScope::new("expensive_operation", true);
//!     // Work happens here; timing is logged on drop.
//! }
//! ```

use std::time::{Duration, Instant};

/// Measures the time between construction and drop.
///
/// A disabled scope records nothing and logs nothing.
pub struct ProfileScope {
    name: &'static str,
    start: Option<Instant>,
}

impl ProfileScope {
    pub fn new(name: &'static str, enabled: bool) -> Self {
        Self {
            name,
            start: enabled.then(Instant::now),
        }
    }

    pub fn elapsed(&self) -> Option<Duration> {
        self.start.map(|s| s.elapsed())
    }
}

impl Drop for ProfileScope {
    fn drop(&mut self) {
        if let Some(elapsed) = self.elapsed() {
            tracing::info!(
                scope = self.name,
                elapsed_us = elapsed.as_micros() as u64,
                "timer"
            );
        }
    }
}

/// Aggregate of many timed iterations (per-tick timings).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimingSummary {
    pub count: u64,
    pub total: Duration,
    pub max: Duration,
}

impl TimingSummary {
    pub fn record(&mut self, elapsed: Duration) {
        self.count += 1;
        self.total += elapsed;
        self.max = self.max.max(elapsed);
    }

    pub fn mean(&self) -> Duration {
        if self.count == 0 {
            return Duration::ZERO;
        }
        self.total / self.count as u32
    }
}
