//! Output module for crawl summaries
//!
//! This module handles:
//! - Building a count summary of the crawled graph
//! - Printing it as plain text at the end of a CLI run

mod summary;

pub use summary::{format_summary, print_summary, summarize, GraphSummary};
