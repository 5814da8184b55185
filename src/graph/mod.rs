//! Graph module for the crawled link structure
//!
//! This module contains:
//! - `CrawlGraph`: the directed multigraph of pages with its dedup indices
//! - `Vertex` and `PageDetails`: per-page attributes
//! - `SharedGraph`: the handle the crawl worker writes through and renderers read
//!
//! The worker is the only writer. Readers take the read lock for as long as
//! they need a consistent view; a page's vertex, links and edges are always
//! applied under one write lock.

mod store;
mod types;

pub use store::CrawlGraph;
pub use types::{PageDetails, Vertex};

use petgraph::graph::NodeIndex;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;

/// Stable reference to a vertex within one crawl
pub type VertexId = NodeIndex;

/// Graph shared between the crawl worker and readers
pub type SharedGraph = Arc<RwLock<CrawlGraph>>;

/// Errors raised by graph mutations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("Page id {page_id} is already visited as '{title}'")]
    AlreadyVisitedId { page_id: u64, title: String },

    #[error("Vertex '{0}' is already visited")]
    VertexAlreadyVisited(String),

    #[error("Unknown vertex: {0}")]
    UnknownVertex(usize),
}

/// Result type for graph operations
pub type GraphResult<T> = Result<T, GraphError>;

/// Creates an empty shared graph
pub fn shared_graph(load_details: bool) -> SharedGraph {
    Arc::new(RwLock::new(CrawlGraph::new(load_details)))
}

/// Acquires the read lock, recovering from a poisoned lock
pub fn read_graph(graph: &SharedGraph) -> RwLockReadGuard<'_, CrawlGraph> {
    graph.read().unwrap_or_else(|e| e.into_inner())
}

/// Acquires the write lock, recovering from a poisoned lock
pub fn write_graph(graph: &SharedGraph) -> RwLockWriteGuard<'_, CrawlGraph> {
    graph.write().unwrap_or_else(|e| e.into_inner())
}
