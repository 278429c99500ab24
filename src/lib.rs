pub mod config;
pub mod crawlers;
pub mod error;
pub mod filter;
pub mod parsers;
pub mod results;
pub mod sink;
pub mod spider;
pub mod utils;

// Re-export commonly used types for convenience
pub use config::{CrawlConfig, FetcherKind};
pub use crawlers::engine::{CrawlHandle, CrawlStats};
pub use error::{CrawlError, Result};
pub use results::OutputRecord;
pub use spider::CreditSpider;

use crawlers::engine::{self, EngineConfig};
use crawlers::{Fetcher, HttpFetcher, WebDriverFetcher};
use filter::UrlFilter;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Main builder for a credits crawl
pub struct Crawl {
    config: CrawlConfig,
}

impl Crawl {
    /// Create a builder with default configuration
    pub fn new() -> Self {
        Self {
            config: CrawlConfig::default(),
        }
    }

    /// Replace the configuration
    pub fn with_config(mut self, config: CrawlConfig) -> Self {
        self.config = config;
        self
    }

    /// Load configuration from a file
    pub fn with_config_file(self, path: impl AsRef<Path>) -> Result<Self> {
        let config = CrawlConfig::from_file(path)?;
        Ok(self.with_config(config))
    }

    /// Load configuration from a string
    pub fn with_config_str(self, config_str: &str) -> Result<Self> {
        let config = CrawlConfig::from_json(config_str)?;
        Ok(self.with_config(config))
    }

    /// Replace the seed title pages
    pub fn with_seeds(mut self, seeds: Vec<String>) -> Self {
        self.config.start_urls = seeds;
        self
    }

    /// Set the maximum number of fetches in flight
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.config.max_concurrency = max_concurrency;
        self
    }

    /// Set the per-fetch timeout
    pub fn with_request_timeout(mut self, timeout_seconds: u64) -> Self {
        self.config.request_timeout_secs = timeout_seconds;
        self
    }

    /// Set the total timeout (maximum runtime, 0 for none)
    pub fn with_total_timeout(mut self, timeout_seconds: u64) -> Self {
        self.config.total_timeout_secs = timeout_seconds;
        self
    }

    /// Choose the fetch backend
    pub fn with_fetcher(mut self, fetcher: FetcherKind) -> Self {
        self.config.fetcher = fetcher;
        self
    }

    pub fn with_webdriver_url(mut self, url: impl Into<String>) -> Self {
        self.config.webdriver_url = url.into();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Current configuration
    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Start the crawl with the configured fetch backend
    pub fn generate(self) -> Result<CrawlHandle> {
        let fetcher: Arc<dyn Fetcher> = match self.config.fetcher {
            FetcherKind::Http => Arc::new(HttpFetcher::new(
                &self.config.user_agent,
                Duration::from_secs(self.config.request_timeout_secs),
            )?),
            FetcherKind::WebDriver => Arc::new(WebDriverFetcher::new(
                &self.config.webdriver_url,
                self.config.max_concurrency,
            )),
        };
        self.generate_with(fetcher)
    }

    /// Start the crawl with a caller-supplied fetch backend
    pub fn generate_with(self, fetcher: Arc<dyn Fetcher>) -> Result<CrawlHandle> {
        let spider = Arc::new(CreditSpider::new(&self.config.selectors)?);
        let filter = Arc::new(UrlFilter::new(self.config.filter.clone())?);
        let seeds = self
            .config
            .start_urls
            .iter()
            .map(|s| utils::parse_location(s))
            .collect::<Result<Vec<_>>>()?;

        engine::start(
            spider,
            fetcher,
            filter,
            &seeds,
            EngineConfig::from_crawl_config(&self.config),
        )
    }
}

impl Default for Crawl {
    fn default() -> Self {
        Self::new()
    }
}
