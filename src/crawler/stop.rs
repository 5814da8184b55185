//! Stop-condition evaluation
//!
//! A pure check run by the worker after every committed page. Any single
//! satisfied condition ends the crawl.

use crate::config::StopConditions;
use crate::graph::CrawlGraph;
use std::fmt;
use std::time::Duration;

/// Why a crawl finished on its own
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The target title is known to the graph
    ReachedPage(String),

    /// The graph holds at least this many vertices
    MaxPages(usize),

    /// The newest vertex lies deeper than this many hops from the root
    MaxDepth(usize),

    /// Active crawl time went past the limit
    TimeLimit(Duration),

    /// Every known link has been followed
    Exhausted,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReachedPage(title) => write!(f, "reached page '{}'", title),
            Self::MaxPages(max) => write!(f, "reached {} pages", max),
            Self::MaxDepth(max) => write!(f, "went deeper than {} links", max),
            Self::TimeLimit(limit) => write!(f, "ran longer than {:.1}s", limit.as_secs_f64()),
            Self::Exhausted => write!(f, "no links left to follow"),
        }
    }
}

/// Returns the first satisfied stop condition, if any
///
/// Conditions are checked in a fixed order: reach page, max pages, max
/// depth, time limit.
pub fn triggered(
    graph: &CrawlGraph,
    elapsed: Duration,
    conditions: &StopConditions,
) -> Option<StopReason> {
    if let Some(target) = &conditions.reach_page {
        if graph.contains_title(target) {
            return Some(StopReason::ReachedPage(target.clone()));
        }
    }

    if let Some(max) = conditions.max_page {
        if graph.vertex_count() >= max {
            return Some(StopReason::MaxPages(max));
        }
    }

    if let Some(max) = conditions.max_depth {
        let depth = graph.last_vertex().and_then(|id| graph.depth_of(id));
        if depth.is_some_and(|d| d > max) {
            return Some(StopReason::MaxDepth(max));
        }
    }

    if let Some(limit) = conditions.time_limit() {
        if elapsed > limit {
            return Some(StopReason::TimeLimit(limit));
        }
    }

    None
}

/// Returns true if any stop condition is satisfied
pub fn should_stop(graph: &CrawlGraph, elapsed: Duration, conditions: &StopConditions) -> bool {
    triggered(graph, elapsed, conditions).is_some()
}
