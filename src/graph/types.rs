use serde::Serialize;

/// Detail attributes of a visited page
///
/// Only present on vertices visited by a crawl with detail loading enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageDetails {
    pub summary: String,
    pub word_count: usize,
    pub reference_count: usize,
    pub image_count: usize,
    pub category_count: usize,
}

/// One page of the link graph, either pending or visited
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Vertex {
    pub title: String,

    /// Remote page id, set once the vertex is visited
    pub page_id: Option<u64>,

    pub visited: bool,

    /// Outbound link titles, populated on visit
    pub links: Vec<String>,

    pub details: Option<PageDetails>,
}

impl Vertex {
    /// Creates a pending vertex
    pub fn pending(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            page_id: None,
            visited: false,
            links: Vec::new(),
            details: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        !self.visited
    }
}
