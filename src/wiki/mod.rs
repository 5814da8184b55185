//! Page fetching for the crawler
//!
//! This module contains:
//! - The `PageFetcher` contract the crawl controller pulls pages through
//! - The page record and fetch error types
//! - `WikiClient`, an adapter for the MediaWiki action API

mod client;
mod types;

pub use client::{build_http_client, WikiClient};
pub use types::{FetchError, PageRecord};

use async_trait::async_trait;

/// Source of encyclopedia pages
///
/// Implementations perform one logical request per call; retrying is their
/// own concern, the crawler simply skips titles that fail.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches the page stored under `title` on the `language` wiki
    ///
    /// Detail fields of the record are only populated when `load_details` is set.
    async fn fetch(
        &self,
        language: &str,
        title: &str,
        load_details: bool,
    ) -> Result<PageRecord, FetchError>;

    /// Picks the title of a random article
    async fn random_title(&self, language: &str) -> Result<String, FetchError>;
}
