use crate::ConfigError;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Main configuration structure for Wikiweave
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawl: CrawlSettings,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
}

/// Order in which the frontier hands out titles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum SearchAlgo {
    /// Level order: links are appended and popped from the head
    #[default]
    Bfs,
    /// Pre-order: each batch of links is prepended to the head
    Dfs,
    /// Level order with the head swapped against a random element after each push
    Random,
}

impl SearchAlgo {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bfs => "BFS",
            Self::Dfs => "DFS",
            Self::Random => "RANDOM",
        }
    }
}

impl fmt::Display for SearchAlgo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchAlgo {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BFS" => Ok(Self::Bfs),
            "DFS" => Ok(Self::Dfs),
            "RANDOM" | "RAND" => Ok(Self::Random),
            other => Err(ConfigError::Validation(format!(
                "search-algo must be one of BFS, DFS, RANDOM, got '{}'",
                other
            ))),
        }
    }
}

impl TryFrom<String> for SearchAlgo {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Parameters of a single crawl session
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlSettings {
    /// Wiki language code, e.g. "en"
    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default)]
    pub search_algo: SearchAlgo,

    /// Courtesy pause after every visited page
    #[serde(default = "default_delay_seconds")]
    pub delay_seconds: f64,

    /// Seed page; a random page is picked when absent
    #[serde(default)]
    pub start_title: Option<String>,

    /// Whether to fetch summary, categories, references and images
    #[serde(default = "default_load_details")]
    pub load_details: bool,

    #[serde(default)]
    pub stop: StopConditions,
}

impl CrawlSettings {
    /// Inter-request delay as a duration, zero if not representable
    pub fn delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.delay_seconds).unwrap_or(Duration::ZERO)
    }
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            language: default_language(),
            search_algo: SearchAlgo::default(),
            delay_seconds: default_delay_seconds(),
            start_title: None,
            load_details: default_load_details(),
            stop: StopConditions::default(),
        }
    }
}

/// Optional thresholds that end a crawl autonomously
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StopConditions {
    /// Stop as soon as this title is known to the graph
    #[serde(default)]
    pub reach_page: Option<String>,

    /// Stop once the graph holds at least this many vertices
    #[serde(default)]
    pub max_page: Option<usize>,

    /// Stop once the newest vertex lies deeper than this
    #[serde(default)]
    pub max_depth: Option<usize>,

    /// Stop once active crawl time exceeds this many seconds
    #[serde(default)]
    pub time_limit_seconds: Option<f64>,
}

impl StopConditions {
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_seconds
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }

    /// Returns true if no condition is configured
    pub fn is_empty(&self) -> bool {
        self.reach_page.is_none()
            && self.max_page.is_none()
            && self.max_depth.is_none()
            && self.time_limit_seconds.is_none()
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the header value: Name/Version (+ContactURL; ContactEmail)
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

fn default_language() -> String {
    "en".to_string()
}

fn default_delay_seconds() -> f64 {
    1.0
}

fn default_load_details() -> bool {
    true
}
