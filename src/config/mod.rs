//! Configuration module for Wikiweave
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use wikiweave::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("wikiweave.toml")).unwrap();
//! println!("Crawler will use {}", config.crawl.search_algo);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlSettings, SearchAlgo, StopConditions, UserAgentConfig};

// Re-export parser functions
pub use parser::{load_config, parse_config};

pub use validation::{validate, validate_settings, SUPPORTED_LANGUAGES};
