//! Crawler module for the link-graph crawl engine
//!
//! This module contains the core crawling logic, including:
//! - The frontier and its traversal policies (BFS, DFS, RANDOM)
//! - Stop-condition evaluation
//! - The background worker loop
//! - The crawl controller state machine and its progress events

mod controller;
mod events;
mod frontier;
mod stop;
mod worker;

pub use controller::{CrawlController, CrawlSession};
pub use events::{CrawlEvent, EventBus};
pub use frontier::Frontier;
pub use stop::{should_stop, triggered, StopReason};
