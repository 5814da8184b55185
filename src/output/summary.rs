//! Plain-text crawl summary
//!
//! Counts plus a few graph facts; drawing the graph is left to renderers.

use crate::crawler::CrawlController;
use crate::graph::{read_graph, CrawlGraph};
use crate::state::{format_elapsed, CrawlStatus};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Snapshot of a crawl session's graph and status
#[derive(Debug, Clone, PartialEq)]
pub struct GraphSummary {
    pub status: CrawlStatus,
    pub start_title: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub elapsed: Duration,
    pub vertices: usize,
    pub visited: usize,
    pub edges: usize,
    pub categories: usize,
    /// Title with the most incoming links and its in-degree
    pub most_linked: Option<(String, usize)>,
    /// Newest vertex and the titles on a shortest path to it from the seed
    pub latest_path: Option<Vec<String>>,
}

impl GraphSummary {
    /// Builds a summary from a graph and session facts
    pub fn from_graph(graph: &CrawlGraph, status: CrawlStatus, elapsed: Duration) -> Self {
        Self {
            status,
            start_title: None,
            started_at: None,
            elapsed,
            vertices: graph.vertex_count(),
            visited: graph.visited_count(),
            edges: graph.edge_count(),
            categories: graph.categories().len(),
            most_linked: most_linked(graph),
            latest_path: latest_path(graph),
        }
    }

    /// Pages discovered but not visited
    pub fn pending(&self) -> usize {
        self.vertices.saturating_sub(self.visited)
    }
}

fn most_linked(graph: &CrawlGraph) -> Option<(String, usize)> {
    graph
        .vertices()
        .map(|(id, vertex)| (vertex.title.clone(), graph.in_degree(id)))
        .filter(|(_, count)| *count > 0)
        .max_by_key(|(_, count)| *count)
}

fn latest_path(graph: &CrawlGraph) -> Option<Vec<String>> {
    let path = graph.shortest_path(graph.root()?, graph.last_vertex()?)?;
    path.into_iter()
        .map(|id| graph.vertex(id).map(|v| v.title.clone()))
        .collect()
}

/// Summarizes the controller's current session
pub fn summarize(controller: &CrawlController) -> GraphSummary {
    let graph = controller.graph();
    let mut summary = GraphSummary::from_graph(
        &read_graph(&graph),
        controller.status(),
        controller.elapsed(),
    );

    if let Some(session) = controller.session() {
        summary.start_title = Some(session.start_title.clone());
        summary.started_at = Some(session.started_at);
    }

    summary
}

/// Formats a summary as an indented text block
pub fn format_summary(summary: &GraphSummary) -> String {
    let mut out = String::new();

    out.push_str("=== Crawl Summary ===\n\n");
    if let Some(title) = &summary.start_title {
        out.push_str(&format!("  Start page: {}\n", title));
    }
    if let Some(started) = summary.started_at {
        out.push_str(&format!(
            "  Started:    {}\n",
            started.format("%Y-%m-%d %H:%M:%S UTC")
        ));
    }
    out.push_str(&format!("  Status:     {}\n", summary.status));
    out.push_str(&format!(
        "  Elapsed:    {}\n\n",
        format_elapsed(summary.elapsed)
    ));

    out.push_str(&format!("  Vertices:   {}\n", summary.vertices));
    out.push_str(&format!("    visited:  {}\n", summary.visited));
    out.push_str(&format!("    pending:  {}\n", summary.pending()));
    out.push_str(&format!("  Edges:      {}\n", summary.edges));
    if summary.categories > 0 {
        out.push_str(&format!("  Categories: {}\n", summary.categories));
    }
    if let Some((title, count)) = &summary.most_linked {
        out.push_str(&format!("  Most linked: {} ({} incoming)\n", title, count));
    }
    if let Some(path) = &summary.latest_path {
        out.push_str(&format!(
            "  Latest page: {} ({} hops: {})\n",
            path.last().map_or("", String::as_str),
            path.len().saturating_sub(1),
            path.join(" -> ")
        ));
    }

    out
}

/// Prints a summary to stdout
pub fn print_summary(summary: &GraphSummary) {
    print!("{}", format_summary(summary));
}
