//! In-memory link graph
//!
//! `CrawlGraph` wraps a petgraph `DiGraph` and keeps the two dedup indices
//! the crawler relies on: title to vertex and remote page id to vertex.

use crate::graph::{GraphError, GraphResult, PageDetails, Vertex, VertexId};
use crate::wiki::PageRecord;
use petgraph::algo::{astar, dijkstra};
use petgraph::graph::DiGraph;
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{BTreeSet, HashMap};

/// Directed multigraph of encyclopedia pages
#[derive(Debug, Clone, Default)]
pub struct CrawlGraph {
    graph: DiGraph<Vertex, ()>,
    by_title: HashMap<String, VertexId>,
    by_page_id: HashMap<u64, VertexId>,
    /// Canonical titles of visited pages whose title another vertex holds
    redirected: HashMap<String, VertexId>,
    categories: BTreeSet<String>,
    load_details: bool,
    root: Option<VertexId>,
    last_added: Option<VertexId>,
}

impl CrawlGraph {
    /// Creates an empty graph
    ///
    /// Detail attributes are only recorded when `load_details` is set.
    pub fn new(load_details: bool) -> Self {
        Self {
            load_details,
            ..Self::default()
        }
    }

    // ===== Mutation =====

    /// Returns the vertex for `title`, creating a pending one if needed
    ///
    /// The first vertex ever created becomes the root.
    pub fn ensure_vertex(&mut self, title: &str) -> VertexId {
        if let Some(&id) = self.by_title.get(title) {
            return id;
        }

        let id = self.graph.add_node(Vertex::pending(title));
        self.by_title.insert(title.to_string(), id);
        self.root.get_or_insert(id);
        self.last_added = Some(id);
        id
    }

    /// Records a fetched page on its vertex
    ///
    /// Fails if the vertex was already visited or if the page id is already
    /// indexed to another vertex; the graph is unchanged on failure.
    ///
    /// A redirect renames the vertex to the canonical title unless another
    /// vertex already holds it; titles stay unique.
    pub fn mark_visited(&mut self, id: VertexId, record: &PageRecord) -> GraphResult<()> {
        let vertex = self
            .graph
            .node_weight(id)
            .ok_or(GraphError::UnknownVertex(id.index()))?;

        if vertex.visited {
            return Err(GraphError::VertexAlreadyVisited(vertex.title.clone()));
        }

        if let Some(&other) = self.by_page_id.get(&record.page_id) {
            if other != id {
                return Err(GraphError::AlreadyVisitedId {
                    page_id: record.page_id,
                    title: self.graph[other].title.clone(),
                });
            }
        }

        let details = if self.load_details {
            if let Some(categories) = &record.categories {
                self.categories.extend(categories.iter().cloned());
            }
            Some(details_of(record))
        } else {
            None
        };

        let adopt_title = match self.by_title.get(&record.title) {
            Some(&owner) => owner == id,
            None => true,
        };

        // Redirected titles resolve to the same vertex from now on
        if adopt_title {
            self.by_title.insert(record.title.clone(), id);
        } else {
            self.redirected.insert(record.title.clone(), id);
        }
        self.by_page_id.insert(record.page_id, id);

        let vertex = &mut self.graph[id];
        if adopt_title {
            vertex.title = record.title.clone();
        }
        vertex.page_id = Some(record.page_id);
        vertex.visited = true;
        vertex.links = record.links.clone();
        vertex.details = details;

        Ok(())
    }

    /// Appends a directed edge; parallel edges are kept
    pub fn add_edge(&mut self, source: VertexId, target: VertexId) {
        self.graph.add_edge(source, target, ());
    }

    // ===== Reads =====

    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Union of the categories of all visited vertices
    pub fn categories(&self) -> &BTreeSet<String> {
        &self.categories
    }

    pub fn load_details(&self) -> bool {
        self.load_details
    }

    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.graph.node_weight(id)
    }

    /// Looks a vertex up by any title it is known under
    pub fn find(&self, title: &str) -> Option<VertexId> {
        self.by_title.get(title).copied()
    }

    pub fn contains_title(&self, title: &str) -> bool {
        self.by_title.contains_key(title)
    }

    pub fn contains_page_id(&self, page_id: u64) -> bool {
        self.by_page_id.contains_key(&page_id)
    }

    /// True if `title` names a visited vertex or a page some vertex
    /// was redirected to
    pub fn is_visited(&self, title: &str) -> bool {
        self.redirected.contains_key(title)
            || self
                .find(title)
                .and_then(|id| self.vertex(id))
                .is_some_and(|v| v.visited)
    }

    pub fn visited_count(&self) -> usize {
        self.by_page_id.len()
    }

    /// The seed vertex of the crawl
    pub fn root(&self) -> Option<VertexId> {
        self.root
    }

    /// The most recently created vertex
    pub fn last_vertex(&self) -> Option<VertexId> {
        self.last_added
    }

    /// Number of edges on the shortest path from the root to `id`
    ///
    /// Returns `None` when `id` is unreachable from the root.
    pub fn depth_of(&self, id: VertexId) -> Option<usize> {
        let root = self.root?;
        self.graph.node_weight(id)?;
        dijkstra(&self.graph, root, Some(id), |_| 1usize)
            .get(&id)
            .copied()
    }

    /// Vertices on a shortest path from `source` to `target`, both included
    pub fn shortest_path(&self, source: VertexId, target: VertexId) -> Option<Vec<VertexId>> {
        self.graph.node_weight(source)?;
        self.graph.node_weight(target)?;
        astar(
            &self.graph,
            source,
            |id| id == target,
            |_| 1usize,
            |_| 0usize,
        )
        .map(|(_, path)| path)
    }

    pub fn vertices(&self) -> impl Iterator<Item = (VertexId, &Vertex)> + '_ {
        self.graph
            .node_indices()
            .map(move |id| (id, &self.graph[id]))
    }

    pub fn edges(&self) -> impl Iterator<Item = (VertexId, VertexId)> + '_ {
        self.graph
            .edge_references()
            .map(|edge| (edge.source(), edge.target()))
    }

    pub fn out_degree(&self, id: VertexId) -> usize {
        self.graph.edges_directed(id, Direction::Outgoing).count()
    }

    pub fn in_degree(&self, id: VertexId) -> usize {
        self.graph.edges_directed(id, Direction::Incoming).count()
    }
}

fn details_of(record: &PageRecord) -> PageDetails {
    let summary = record.summary.clone().unwrap_or_default();
    PageDetails {
        word_count: summary.split_whitespace().count(),
        summary,
        reference_count: record.references.as_ref().map_or(0, Vec::len),
        image_count: record.images.as_ref().map_or(0, Vec::len),
        category_count: record.categories.as_ref().map_or(0, Vec::len),
    }
}
