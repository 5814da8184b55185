//! Wikiweave: a live link-graph crawler for online encyclopedias
//!
//! This crate incrementally builds a directed graph of encyclopedia pages by
//! following hyperlinks from a seed page, one fetch at a time, while other
//! threads read the growing graph and subscribe to progress events.

pub mod config;
pub mod crawler;
pub mod graph;
pub mod output;
pub mod state;
pub mod wiki;

use thiserror::Error;

/// Main error type for Wikiweave operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] wiki::FetchError),

    #[error("Invalid state transition: cannot {action} while {from}")]
    InvalidTransition {
        from: state::CrawlStatus,
        action: &'static str,
    },

    #[error("Crawl worker failed: {0}")]
    Worker(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Unsupported wiki language: {0}")]
    UnsupportedLanguage(String),
}

/// Result type alias for Wikiweave operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::{Config, CrawlSettings, SearchAlgo, StopConditions};
pub use crawler::{CrawlController, CrawlEvent, StopReason};
pub use graph::{CrawlGraph, SharedGraph, Vertex, VertexId};
pub use state::CrawlStatus;
pub use wiki::{FetchError, PageFetcher, PageRecord, WikiClient};
