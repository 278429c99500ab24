use crate::crawlers::crawler::Fetcher;
use crate::error::{CrawlError, Result};
use crate::results::Page;
use async_trait::async_trait;
use fantoccini::{Client, ClientBuilder};
use tokio::sync::Mutex;
use url::Url;

/// Fetches pages through browsers driven by a WebDriver server.
///
/// Each in-flight fetch drives its own session. Sessions are opened lazily,
/// returned to an idle pool after use, and discarded when lost. At most
/// `max_sessions` fetches should run at once; the engine honours this through
/// [`Fetcher::concurrency_limit`].
pub struct WebDriverFetcher {
    webdriver_url: String,
    max_sessions: usize,
    idle: Mutex<Vec<Client>>,
}

impl WebDriverFetcher {
    pub fn new(webdriver_url: impl Into<String>, max_sessions: usize) -> Self {
        Self {
            webdriver_url: webdriver_url.into(),
            max_sessions: max_sessions.max(1),
            idle: Mutex::new(Vec::new()),
        }
    }

    /// Connects to the WebDriver instance
    async fn connect(&self) -> Result<Client> {
        match ClientBuilder::native().connect(&self.webdriver_url).await {
            Ok(client) => {
                ::log::debug!("Connected to WebDriver at {}", self.webdriver_url);
                Ok(client)
            }
            Err(e) => {
                ::log::error!(
                    "Make sure a WebDriver server is running or set the WEBDRIVER_URL environment variable"
                );
                Err(CrawlError::WebDriverConnect {
                    url: self.webdriver_url.clone(),
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Take an idle session, opening a new one when none is free
    async fn checkout(&self) -> Result<Client> {
        // Pop in its own statement so the lock is released before connecting
        let idle = self.idle.lock().await.pop();
        match idle {
            Some(client) => Ok(client),
            None => self.connect().await,
        }
    }
}

#[async_trait]
impl Fetcher for WebDriverFetcher {
    async fn fetch(&self, url: &Url) -> Result<Page> {
        let client = self.checkout().await?;

        let result = navigate(&client, url).await;
        match &result {
            Err(CrawlError::WebDriver(e)) if e.to_string().contains("Unable to find session") => {
                ::log::warn!("Lost WebDriver session while fetching {}", url);
            }
            _ => self.idle.lock().await.push(client),
        }
        result
    }

    fn concurrency_limit(&self) -> Option<usize> {
        Some(self.max_sessions)
    }

    async fn close(&self) -> Result<()> {
        let sessions = std::mem::take(&mut *self.idle.lock().await);
        let count = sessions.len();
        for client in sessions {
            client.close().await?;
        }
        ::log::debug!("Closed {} WebDriver session(s)", count);
        Ok(())
    }
}

/// Navigate to `url` and read back the rendered source
async fn navigate(client: &Client, url: &Url) -> Result<Page> {
    ::log::debug!("SCRAPE: {}", url);
    client.goto(url.as_str()).await?;
    let current = client.current_url().await?;
    let source = client.source().await?;
    Ok(Page::new(current, source))
}
