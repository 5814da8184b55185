/// Crawl status definitions for the controller state machine
///
/// This module defines every state a crawl session can be in and which
/// transitions between them are legal.
use std::fmt;

/// Represents the current state of a crawl session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CrawlStatus {
    // ===== Idle States =====
    /// No crawl has run yet, or the last one was interrupted by the user
    #[default]
    Stopped,

    /// The last crawl ended on its own (frontier exhausted or a stop condition fired)
    Done,

    /// The last crawl's worker exited abnormally
    Failed,

    // ===== Active States =====
    /// The worker is fetching pages
    Running,

    /// The worker is parked at its pause gate
    Paused,
}

impl CrawlStatus {
    /// Returns true if no worker is active
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Stopped | Self::Done | Self::Failed)
    }

    /// Returns true if a worker exists for this session
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Running | Self::Paused)
    }

    /// Returns true if a fresh crawl may be started from this state
    pub fn can_start(&self) -> bool {
        self.is_idle()
    }

    pub fn can_pause(&self) -> bool {
        matches!(self, Self::Running)
    }

    pub fn can_resume(&self) -> bool {
        matches!(self, Self::Paused)
    }

    /// Stop is accepted from every state except `Stopped` itself
    pub fn can_stop(&self) -> bool {
        !matches!(self, Self::Stopped)
    }

    /// Lowercase name as shown in status labels
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Done => "done",
            Self::Failed => "failed",
            Self::Running => "running",
            Self::Paused => "paused",
        }
    }
}

impl fmt::Display for CrawlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
