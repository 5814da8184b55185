//! Progress events published by the crawl controller

use crate::crawler::StopReason;
use crate::state::CrawlStatus;
use std::time::Duration;
use tokio::sync::broadcast;

/// Number of events a slow subscriber may lag behind before losing some
const EVENT_CAPACITY: usize = 1024;

/// Notification sent to every subscriber
#[derive(Debug, Clone, PartialEq)]
pub enum CrawlEvent {
    /// The session moved to a new status
    StatusChanged(CrawlStatus),

    /// Total active crawl time after an iteration
    ElapsedTimeChanged(Duration),

    /// A page was committed to the graph
    VerticesAdded {
        vertex_count: usize,
        edge_count: usize,
    },

    /// The crawl finished on its own
    CrawlDone { reason: StopReason },
}

/// Publish side of the event channel
///
/// Publishing never blocks and never fails; events sent while nobody is
/// subscribed are dropped.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CrawlEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    pub fn publish(&self, event: CrawlEvent) {
        tracing::trace!("Event: {:?}", event);
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CrawlEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
