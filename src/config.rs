use crate::error::{CrawlError, Result};
use crate::filter::UrlFilterConfig;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Title page the crawl starts from when no seed is given
pub const DEFAULT_SEED: &str = "https://www.imdb.com/title/tt0804503/";

/// Which backend fetches pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetcherKind {
    /// Plain HTTP client
    #[default]
    Http,
    /// Remote-controlled browser through a WebDriver server
    WebDriver,
}

/// CSS selectors describing the site's markup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorConfig {
    /// Headshot anchors on the full-cast page
    #[serde(default = "default_cast_link")]
    pub cast_link: String,

    /// Attribute of a cast anchor holding the actor page path
    #[serde(default = "default_link_attr")]
    pub link_attr: String,

    /// Element whose first text node is the actor's name
    #[serde(default = "default_actor_name")]
    pub actor_name: String,

    /// Credit links on the filmography page
    #[serde(default = "default_credit_title")]
    pub credit_title: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            cast_link: default_cast_link(),
            link_attr: default_link_attr(),
            actor_name: default_actor_name(),
            credit_title: default_credit_title(),
        }
    }
}

/// Configuration for a crawl
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// Title pages to start from
    #[serde(default = "default_start_urls")]
    pub start_urls: Vec<String>,

    /// Maximum number of fetches in flight
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Per-fetch timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Maximum runtime in seconds (0 disables the limit)
    #[serde(default)]
    pub total_timeout_secs: u64,

    /// User agent sent by the HTTP fetcher
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Fetch backend
    #[serde(default)]
    pub fetcher: FetcherKind,

    /// URL for the WebDriver instance
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    #[serde(default)]
    pub selectors: SelectorConfig,

    /// Scope rules for follow-up requests
    #[serde(default)]
    pub filter: UrlFilterConfig,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            start_urls: default_start_urls(),
            max_concurrency: default_max_concurrency(),
            request_timeout_secs: default_request_timeout_secs(),
            total_timeout_secs: 0,
            user_agent: default_user_agent(),
            fetcher: FetcherKind::default(),
            webdriver_url: default_webdriver_url(),
            selectors: SelectorConfig::default(),
            filter: UrlFilterConfig::default(),
        }
    }
}

impl CrawlConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let read_err = |source| CrawlError::ConfigRead {
            path: path.display().to_string(),
            source,
        };

        let mut file = File::open(path).map_err(read_err)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents).map_err(read_err)?;

        Self::from_json(&contents)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(CrawlError::ConfigParse)
    }

    /// Apply overrides from the environment
    pub fn apply_env(&mut self) {
        // Override the WebDriver URL with an environment variable if provided
        if let Ok(webdriver_url) = std::env::var("WEBDRIVER_URL") {
            if !webdriver_url.is_empty() {
                self.webdriver_url = webdriver_url;
            }
        }
    }
}

fn default_start_urls() -> Vec<String> {
    vec![DEFAULT_SEED.to_string()]
}

/// Default value for max_concurrency
fn default_max_concurrency() -> usize {
    8
}

fn default_request_timeout_secs() -> u64 {
    45
}

fn default_user_agent() -> String {
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string()
}

/// Default value for webdriver_url
fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_cast_link() -> String {
    "td.primary_photo a".to_string()
}

fn default_link_attr() -> String {
    "href".to_string()
}

fn default_actor_name() -> String {
    "h1.header > span:nth-child(1)".to_string()
}

fn default_credit_title() -> String {
    "div.filmo-category-section div.filmo-row b a".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_uses_defaults() {
        let config = CrawlConfig::from_json("{}").unwrap();
        assert_eq!(config.start_urls, vec![DEFAULT_SEED.to_string()]);
        assert_eq!(config.max_concurrency, 8);
        assert_eq!(config.fetcher, FetcherKind::Http);
        assert_eq!(config.selectors, SelectorConfig::default());
        assert_eq!(config.total_timeout_secs, 0);
    }

    #[test]
    fn test_partial_selector_override() {
        let json = r#"{
            "fetcher": "webdriver",
            "selectors": { "credit_title": "li.credit a" },
            "filter": { "allowed_domains": ["imdb.com"] }
        }"#;
        let config = CrawlConfig::from_json(json).unwrap();
        assert_eq!(config.fetcher, FetcherKind::WebDriver);
        assert_eq!(config.selectors.credit_title, "li.credit a");
        assert_eq!(config.selectors.cast_link, "td.primary_photo a");
        assert_eq!(config.filter.allowed_domains, vec!["imdb.com".to_string()]);
    }

    #[test]
    fn test_malformed_json_is_a_parse_error() {
        let err = CrawlConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, CrawlError::ConfigParse(_)));
    }

    #[test]
    fn test_missing_file_is_a_read_error() {
        let err = CrawlConfig::from_file("/nonexistent/credit-crawl.json").unwrap_err();
        assert!(matches!(err, CrawlError::ConfigRead { .. }));
    }
}
