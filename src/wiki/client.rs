//! MediaWiki action API client
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - Page queries with link continuation
//! - Optional detail properties (extract, categories, references, images)
//! - Random article selection
//! - Error classification into `FetchError`

use crate::config::UserAgentConfig;
use crate::wiki::{FetchError, PageFetcher, PageRecord};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::IgnoredAny;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// Upper bound on continuation round-trips for a single page
const MAX_CONTINUATIONS: usize = 50;

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Page fetcher backed by the MediaWiki action API
#[derive(Debug, Clone)]
pub struct WikiClient {
    client: Client,
    /// Fixed API endpoint; when unset the per-language Wikipedia endpoint is used
    base_url: Option<Url>,
}

impl WikiClient {
    /// Creates a client identifying itself with the configured user agent
    pub fn new(config: &UserAgentConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::from_client(build_http_client(config)?))
    }

    pub fn from_client(client: Client) -> Self {
        Self {
            client,
            base_url: None,
        }
    }

    /// Sends every request to `base_url` regardless of language
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    /// Returns the API endpoint for a language
    pub fn endpoint(&self, language: &str) -> Result<Url, FetchError> {
        match &self.base_url {
            Some(url) => Ok(url.clone()),
            None => Url::parse(&format!("https://{}.wikipedia.org/w/api.php", language))
                .map_err(|e| FetchError::transport(language, e)),
        }
    }

    /// Fetches one page, following link continuation until exhausted
    pub async fn fetch_page(
        &self,
        language: &str,
        title: &str,
        load_details: bool,
    ) -> Result<PageRecord, FetchError> {
        let endpoint = self.endpoint(language)?;
        let params = page_query_params(title, load_details);

        let mut page: Option<PageAccumulator> = None;
        let mut continuation: Vec<(String, String)> = Vec::new();
        let mut complete = false;

        for _ in 0..MAX_CONTINUATIONS {
            let response = self
                .query(&endpoint, &params, &continuation, title)
                .await?;

            let api_page = response
                .query
                .and_then(|q| q.pages.into_iter().next())
                .ok_or_else(|| FetchError::NotFound {
                    title: title.to_string(),
                })?;

            if api_page.missing || api_page.invalid || api_page.pageid.is_none() {
                return Err(FetchError::NotFound {
                    title: title.to_string(),
                });
            }

            match page.as_mut() {
                Some(acc) => acc.merge(api_page),
                None => page = Some(PageAccumulator::from(api_page)),
            }

            match response.continuation {
                Some(next) => {
                    continuation = next
                        .into_iter()
                        .map(|(key, value)| (key, value.to_string()))
                        .collect();
                }
                None => {
                    complete = true;
                    break;
                }
            }
        }

        if !complete {
            tracing::warn!(
                "Link list of '{}' truncated after {} continuation requests",
                title,
                MAX_CONTINUATIONS
            );
        }

        let page = page.ok_or_else(|| FetchError::NotFound {
            title: title.to_string(),
        })?;

        if page.disambiguation {
            return Err(FetchError::Disambiguation {
                title: page.title,
                options: page.links,
            });
        }

        tracing::debug!(
            "Fetched '{}' (id {}, {} links)",
            page.title,
            page.page_id,
            page.links.len()
        );

        Ok(page.into_record(load_details))
    }

    /// Asks the wiki for one random article title
    pub async fn fetch_random_title(&self, language: &str) -> Result<String, FetchError> {
        let endpoint = self.endpoint(language)?;
        let params: Vec<(&str, String)> = vec![
            ("action", "query".to_string()),
            ("format", "json".to_string()),
            ("formatversion", "2".to_string()),
            ("list", "random".to_string()),
            ("rnnamespace", "0".to_string()),
            ("rnlimit", "1".to_string()),
        ];

        let response = self.query(&endpoint, &params, &[], "<random>").await?;

        response
            .query
            .and_then(|q| q.random.into_iter().next())
            .map(|entry| entry.title)
            .ok_or_else(|| FetchError::Transport {
                title: "<random>".to_string(),
                message: "random query returned no pages".to_string(),
            })
    }

    async fn query(
        &self,
        endpoint: &Url,
        params: &[(&str, String)],
        continuation: &[(String, String)],
        title: &str,
    ) -> Result<ApiResponse, FetchError> {
        let response = self
            .client
            .get(endpoint.clone())
            .query(params)
            .query(continuation)
            .send()
            .await
            .map_err(|e| FetchError::transport(title, e))?
            .error_for_status()
            .map_err(|e| FetchError::transport(title, e))?;

        let body: ApiResponse = response
            .json()
            .await
            .map_err(|e| FetchError::transport(title, e))?;

        if let Some(error) = &body.error {
            return Err(FetchError::Transport {
                title: title.to_string(),
                message: format!("{}: {}", error.code, error.info),
            });
        }

        Ok(body)
    }
}

#[async_trait]
impl PageFetcher for WikiClient {
    async fn fetch(
        &self,
        language: &str,
        title: &str,
        load_details: bool,
    ) -> Result<PageRecord, FetchError> {
        self.fetch_page(language, title, load_details).await
    }

    async fn random_title(&self, language: &str) -> Result<String, FetchError> {
        self.fetch_random_title(language).await
    }
}

fn page_query_params(title: &str, load_details: bool) -> Vec<(&'static str, String)> {
    let mut prop = String::from("info|links|pageprops");
    if load_details {
        prop.push_str("|extracts|categories|extlinks|images");
    }

    let mut params = vec![
        ("action", "query".to_string()),
        ("format", "json".to_string()),
        ("formatversion", "2".to_string()),
        ("redirects", "1".to_string()),
        ("titles", title.to_string()),
        ("prop", prop),
        ("plnamespace", "0".to_string()),
        ("pllimit", "max".to_string()),
        ("ppprop", "disambiguation".to_string()),
    ];

    if load_details {
        params.extend([
            ("exintro", "1".to_string()),
            ("explaintext", "1".to_string()),
            ("cllimit", "max".to_string()),
            ("ellimit", "max".to_string()),
            ("imlimit", "max".to_string()),
        ]);
    }

    params
}

/// Page properties gathered across continuation responses
struct PageAccumulator {
    page_id: u64,
    title: String,
    disambiguation: bool,
    links: Vec<String>,
    summary: Option<String>,
    categories: Vec<String>,
    references: Vec<String>,
    images: Vec<String>,
}

impl PageAccumulator {
    fn merge(&mut self, page: ApiPage) {
        self.disambiguation |= page.pageprops.is_some_and(|p| p.disambiguation.is_some());
        self.links.extend(page.links.into_iter().map(|l| l.title));
        if self.summary.is_none() {
            self.summary = page.extract;
        }
        self.categories
            .extend(page.categories.into_iter().map(|c| strip_namespace(&c.title)));
        self.references
            .extend(page.extlinks.into_iter().map(|e| e.url));
        self.images.extend(page.images.into_iter().map(|i| i.title));
    }

    fn into_record(self, load_details: bool) -> PageRecord {
        let mut record = PageRecord::new(self.page_id, self.title, self.links);
        if load_details {
            record.summary = Some(self.summary.unwrap_or_default());
            record.categories = Some(self.categories);
            record.references = Some(self.references);
            record.images = Some(self.images);
        }
        record
    }
}

impl From<ApiPage> for PageAccumulator {
    fn from(page: ApiPage) -> Self {
        let mut acc = Self {
            page_id: page.pageid.unwrap_or_default(),
            title: page.title.clone(),
            disambiguation: false,
            links: Vec::new(),
            summary: None,
            categories: Vec::new(),
            references: Vec::new(),
            images: Vec::new(),
        };
        acc.merge(page);
        acc
    }
}

/// Drops a "Category:"-style namespace prefix
fn strip_namespace(title: &str) -> String {
    match title.split_once(':') {
        Some((_, name)) => name.to_string(),
        None => title.to_string(),
    }
}

// ===== Wire format (formatversion=2) =====

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default, rename = "continue")]
    continuation: Option<HashMap<String, ContinueValue>>,
    #[serde(default)]
    query: Option<QueryBody>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ContinueValue {
    Text(String),
    Number(i64),
}

impl std::fmt::Display for ContinueValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{}", n),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    #[serde(default)]
    info: String,
}

#[derive(Debug, Deserialize)]
struct QueryBody {
    #[serde(default)]
    pages: Vec<ApiPage>,
    #[serde(default)]
    random: Vec<TitleEntry>,
}

#[derive(Debug, Deserialize)]
struct ApiPage {
    #[serde(default)]
    pageid: Option<u64>,
    title: String,
    #[serde(default)]
    missing: bool,
    #[serde(default)]
    invalid: bool,
    #[serde(default)]
    links: Vec<TitleEntry>,
    #[serde(default)]
    pageprops: Option<PageProps>,
    #[serde(default)]
    extract: Option<String>,
    #[serde(default)]
    categories: Vec<TitleEntry>,
    #[serde(default)]
    extlinks: Vec<ExtLink>,
    #[serde(default)]
    images: Vec<TitleEntry>,
}

#[derive(Debug, Deserialize)]
struct TitleEntry {
    title: String,
}

#[derive(Debug, Deserialize)]
struct PageProps {
    #[serde(default)]
    disambiguation: Option<IgnoredAny>,
}

#[derive(Debug, Deserialize)]
struct ExtLink {
    #[serde(alias = "*")]
    url: String,
}
