use std::sync::Mutex;
use std::time::Duration;

/// Accumulates the active time of a crawl session
///
/// Only time the worker spends fetching, mutating the graph and sleeping its
/// courtesy delay is added; time parked at the pause gate never is.
#[derive(Debug, Default)]
pub struct ElapsedClock {
    total: Mutex<Duration>,
}

impl ElapsedClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a span of active time and returns the new total
    pub fn add(&self, span: Duration) -> Duration {
        let mut total = self.total.lock().unwrap_or_else(|e| e.into_inner());
        *total += span;
        *total
    }

    /// Returns the accumulated active time
    pub fn get(&self) -> Duration {
        *self.total.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Resets the clock for a new session
    pub fn reset(&self) {
        *self.total.lock().unwrap_or_else(|e| e.into_inner()) = Duration::ZERO;
    }
}

/// Formats a duration as `H:MM:SS`, truncating sub-second precision
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}
