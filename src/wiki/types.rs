use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A fetched encyclopedia page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    /// Stable identifier of the page on the remote wiki
    pub page_id: u64,

    /// Canonical title (after redirects)
    pub title: String,

    /// Titles of linked articles, in the order the wiki reports them
    pub links: Vec<String>,

    // ===== Detail fields (only when details were requested) =====
    /// Plain-text introduction
    pub summary: Option<String>,

    /// Category names without the namespace prefix
    pub categories: Option<Vec<String>>,

    /// External reference URLs
    pub references: Option<Vec<String>>,

    /// Image file titles
    pub images: Option<Vec<String>>,
}

impl PageRecord {
    /// Creates a record without detail fields
    pub fn new(page_id: u64, title: impl Into<String>, links: Vec<String>) -> Self {
        Self {
            page_id,
            title: title.into(),
            links,
            summary: None,
            categories: None,
            references: None,
            images: None,
        }
    }

    /// Returns true if any detail field was populated
    pub fn has_details(&self) -> bool {
        self.summary.is_some()
            || self.categories.is_some()
            || self.references.is_some()
            || self.images.is_some()
    }
}

/// Reasons a page could not be fetched
///
/// The crawler treats all of them the same way: the title is skipped and the
/// crawl continues with the next frontier entry.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FetchError {
    #[error("Page not found: {title}")]
    NotFound { title: String },

    #[error("'{title}' is a disambiguation page ({} options)", .options.len())]
    Disambiguation { title: String, options: Vec<String> },

    #[error("Transport error fetching '{title}': {message}")]
    Transport { title: String, message: String },
}

impl FetchError {
    /// Title the failed request was made for
    pub fn title(&self) -> &str {
        match self {
            Self::NotFound { title }
            | Self::Disambiguation { title, .. }
            | Self::Transport { title, .. } => title,
        }
    }

    pub(crate) fn transport(title: &str, err: impl std::fmt::Display) -> Self {
        Self::Transport {
            title: title.to_string(),
            message: err.to_string(),
        }
    }
}
