//! State module for tracking crawl progress
//!
//! This module provides the session-level state shared between the crawl
//! controller and its worker.
//!
//! # Components
//!
//! - `CrawlStatus`: The controller state machine (stopped, running, paused, done, failed)
//! - `ElapsedClock`: Active crawl time, excluding time spent paused

mod crawl_status;
mod elapsed;

// Re-export main types
pub use crawl_status::CrawlStatus;
pub use elapsed::{format_elapsed, ElapsedClock};
