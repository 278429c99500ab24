use crate::config::CrawlConfig;
use crate::crawlers::crawler::Fetcher;
use crate::error::{CrawlError, Result};
use crate::filter::UrlFilter;
use crate::results::OutputRecord;
use crate::spider::{CreditSpider, ParseOutput, Request};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;
use url::Url;

/// Runtime limits for the engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum number of fetches in flight
    pub max_concurrency: usize,
    /// Per-fetch timeout
    pub request_timeout: Duration,
    /// Maximum runtime of the whole crawl
    pub total_timeout: Option<Duration>,
    /// Capacity of the record channel
    pub channel_capacity: usize,
}

impl EngineConfig {
    pub fn from_crawl_config(config: &CrawlConfig) -> Self {
        Self {
            max_concurrency: config.max_concurrency,
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            total_timeout: (config.total_timeout_secs > 0)
                .then(|| Duration::from_secs(config.total_timeout_secs)),
            channel_capacity: 1024,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_crawl_config(&CrawlConfig::default())
    }
}

/// Counters reported when a crawl ends
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStats {
    /// Pages fetched and handled
    pub pages: usize,
    /// Fetches that failed or timed out
    pub failures: usize,
    /// Requests dropped because their location was already scheduled
    pub duplicates: usize,
    /// Follow-up requests rejected by the URL filter
    pub filtered: usize,
    /// Records handed to the receiver
    pub records: usize,
    /// Whether the total timeout cut the crawl short
    pub timed_out: bool,
}

/// A running crawl
pub struct CrawlHandle {
    /// Output records in the order pages complete. Closes when the crawl ends.
    pub records: mpsc::Receiver<OutputRecord>,
    /// Resolves to the final counters once the crawl ends
    pub stats: JoinHandle<CrawlStats>,
}

/// Starts an async crawl from `seeds` and returns a handle yielding records as they are extracted.
///
/// Seeds are turned into full-cast requests before anything is spawned, so an
/// unusable seed fails here rather than mid-crawl.
pub fn start(
    spider: Arc<CreditSpider>,
    fetcher: Arc<dyn Fetcher>,
    filter: Arc<UrlFilter>,
    seeds: &[Url],
    config: EngineConfig,
) -> Result<CrawlHandle> {
    let queue: VecDeque<Request> = spider.start_requests(seeds)?.into();
    ::log::info!("Starting crawl with {} seed request(s)", queue.len());

    let (result_tx, result_rx) = mpsc::channel::<OutputRecord>(config.channel_capacity.max(1));

    let stats = tokio::spawn(async move {
        let stats = dispatch(spider, Arc::clone(&fetcher), filter, config, queue, result_tx).await;

        if let Err(e) = fetcher.close().await {
            ::log::warn!("Failed to close fetcher: {}", e);
        }

        ::log::info!(
            "Crawl finished: {} pages, {} failures, {} duplicates skipped, {} filtered, {} records",
            stats.pages,
            stats.failures,
            stats.duplicates,
            stats.filtered,
            stats.records
        );
        stats
    });

    Ok(CrawlHandle {
        records: result_rx,
        stats,
    })
}

/// Owns the queue and visited set; keeps up to `max_concurrency` fetches in flight,
/// fewer when the fetcher reports a lower limit
async fn dispatch(
    spider: Arc<CreditSpider>,
    fetcher: Arc<dyn Fetcher>,
    filter: Arc<UrlFilter>,
    config: EngineConfig,
    mut queue: VecDeque<Request>,
    result_tx: mpsc::Sender<OutputRecord>,
) -> CrawlStats {
    let max_concurrency = match fetcher.concurrency_limit() {
        Some(limit) => config.max_concurrency.min(limit),
        None => config.max_concurrency,
    }
    .max(1);
    let deadline = config.total_timeout.map(|t| Instant::now() + t);

    let mut visited = HashSet::new();
    let mut in_flight = JoinSet::new();
    let mut stats = CrawlStats::default();

    loop {
        while in_flight.len() < max_concurrency {
            let Some(mut request) = queue.pop_front() else {
                break;
            };

            request.url = filter.normalize_url(&request.url);
            if !visited.insert(request.url.to_string()) {
                ::log::debug!("Skipping already scheduled: {}", request.url);
                stats.duplicates += 1;
                continue;
            }

            ::log::debug!("Scheduling {:?} request: {}", request.callback, request.url);
            let spider = Arc::clone(&spider);
            let fetcher = Arc::clone(&fetcher);
            let request_timeout = config.request_timeout;
            in_flight.spawn(async move {
                let result = fetch_and_parse(&spider, fetcher.as_ref(), &request, request_timeout).await;
                (request, result)
            });
        }

        let joined = match deadline {
            Some(deadline) => match tokio::time::timeout_at(deadline, in_flight.join_next()).await {
                Ok(joined) => joined,
                Err(_) => {
                    ::log::warn!(
                        "Total timeout reached; abandoning {} in-flight and {} queued requests",
                        in_flight.len(),
                        queue.len()
                    );
                    in_flight.abort_all();
                    stats.timed_out = true;
                    break;
                }
            },
            None => in_flight.join_next().await,
        };

        // Nothing in flight and nothing queued
        let Some(joined) = joined else {
            break;
        };

        match joined {
            Ok((request, Ok(output))) => {
                stats.pages += 1;
                ::log::info!(
                    "Processed {}: {} follow-up request(s), {} record(s)",
                    request.url,
                    output.requests.len(),
                    output.records.len()
                );

                for record in output.records {
                    if result_tx.send(record).await.is_err() {
                        ::log::warn!("Record receiver dropped; stopping crawl");
                        in_flight.abort_all();
                        return stats;
                    }
                    stats.records += 1;
                }

                for follow_up in output.requests {
                    if filter.should_crawl(&follow_up.url) {
                        queue.push_back(follow_up);
                    } else {
                        ::log::debug!("URL filter rejected: {}", follow_up.url);
                        stats.filtered += 1;
                    }
                }
            }
            Ok((request, Err(e))) => {
                stats.failures += 1;
                ::log::warn!("Dropping {}: {}", request.url, e);
            }
            Err(e) => {
                stats.failures += 1;
                ::log::error!("Fetch task failed: {}", e);
            }
        }
    }

    stats
}

/// Fetch one request and hand the page to its callback
async fn fetch_and_parse(
    spider: &CreditSpider,
    fetcher: &dyn Fetcher,
    request: &Request,
    request_timeout: Duration,
) -> Result<ParseOutput> {
    let page = match tokio::time::timeout(request_timeout, fetcher.fetch(&request.url)).await {
        Ok(result) => result?,
        Err(_) => {
            return Err(CrawlError::Timeout {
                url: request.url.to_string(),
                secs: request_timeout.as_secs(),
            });
        }
    };

    Ok(spider.parse(request.callback, &page))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SelectorConfig;
    use crate::filter::UrlFilterConfig;
    use crate::results::Page;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves canned pages; locations listed in `hang` never answer
    #[derive(Default)]
    struct StaticFetcher {
        pages: HashMap<String, String>,
        hang: Vec<String>,
        fetched: Mutex<Vec<String>>,
    }

    impl StaticFetcher {
        fn with_page(mut self, url: &str, body: String) -> Self {
            self.pages.insert(url.to_string(), body);
            self
        }

        fn hanging_on(mut self, url: &str) -> Self {
            self.hang.push(url.to_string());
            self
        }

        fn fetch_count(&self, url: &str) -> usize {
            self.fetched.lock().unwrap().iter().filter(|u| *u == url).count()
        }
    }

    #[async_trait]
    impl Fetcher for StaticFetcher {
        async fn fetch(&self, url: &Url) -> Result<Page> {
            self.fetched.lock().unwrap().push(url.to_string());

            if self.hang.iter().any(|h| h == url.as_str()) {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }

            match self.pages.get(url.as_str()) {
                Some(body) => Ok(Page::new(url.clone(), body.clone())),
                None => Err(CrawlError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("no page at {}", url),
                ))),
            }
        }
    }

    fn cast_page(hrefs: &[&str]) -> String {
        let rows: String = hrefs
            .iter()
            .map(|h| format!(r#"<tr><td class="primary_photo"><a href="{h}"></a></td></tr>"#))
            .collect();
        format!("<html><body><table>{rows}</table></body></html>")
    }

    fn actor_page(name: &str, credits: &[&str]) -> String {
        let rows: String = credits
            .iter()
            .map(|c| format!(r#"<div class="filmo-row"><b><a>{c}</a></b></div>"#))
            .collect();
        format!(
            r#"<html><body><h1 class="header"><span>{name}</span></h1><div class="filmo-category-section">{rows}</div></body></html>"#
        )
    }

    fn spider() -> Arc<CreditSpider> {
        Arc::new(CreditSpider::new(&SelectorConfig::default()).unwrap())
    }

    fn open_filter() -> Arc<UrlFilter> {
        Arc::new(UrlFilter::new(UrlFilterConfig::default()).unwrap())
    }

    fn seed() -> Vec<Url> {
        vec![Url::parse("https://example.com/title/tt1/").unwrap()]
    }

    fn quick_config() -> EngineConfig {
        EngineConfig {
            max_concurrency: 2,
            request_timeout: Duration::from_millis(200),
            total_timeout: None,
            channel_capacity: 4,
        }
    }

    async fn collect(mut handle: CrawlHandle) -> (Vec<OutputRecord>, CrawlStats) {
        let mut records = Vec::new();
        while let Some(record) = handle.records.recv().await {
            records.push(record);
        }
        let stats = handle.stats.await.unwrap();
        records.sort_by(|a, b| (&a.actor, &a.title).cmp(&(&b.actor, &b.title)));
        (records, stats)
    }

    #[tokio::test]
    async fn test_three_hop_crawl_emits_every_credit() {
        let fetcher = Arc::new(
            StaticFetcher::default()
                .with_page(
                    "https://example.com/title/tt1/fullcredits",
                    cast_page(&["/name/nm1/", "/name/nm2/"]),
                )
                .with_page("https://example.com/name/nm1/", actor_page("Jane Doe", &["Movie A", "Movie B"]))
                .with_page("https://example.com/name/nm2/", actor_page("John Roe", &["Movie A"])),
        );

        let handle = start(spider(), fetcher.clone(), open_filter(), &seed(), quick_config()).unwrap();
        let (records, stats) = collect(handle).await;

        assert_eq!(
            records,
            vec![
                OutputRecord::new(Some("Jane Doe".to_string()), "Movie A"),
                OutputRecord::new(Some("Jane Doe".to_string()), "Movie B"),
                OutputRecord::new(Some("John Roe".to_string()), "Movie A"),
            ]
        );
        assert_eq!(stats.pages, 3);
        assert_eq!(stats.records, 3);
        assert_eq!(stats.failures, 0);
        assert_eq!(fetcher.fetch_count("https://example.com/title/tt1/"), 0);
    }

    #[tokio::test]
    async fn test_repeated_locations_are_fetched_once() {
        let fetcher = Arc::new(
            StaticFetcher::default()
                .with_page(
                    "https://example.com/title/tt1/fullcredits",
                    cast_page(&["/name/nm1/", "/name/nm1/#photo", "/name/nm1/"]),
                )
                .with_page("https://example.com/name/nm1/", actor_page("Jane Doe", &["Movie A"])),
        );

        let handle = start(spider(), fetcher.clone(), open_filter(), &seed(), quick_config()).unwrap();
        let (records, stats) = collect(handle).await;

        assert_eq!(records.len(), 1);
        assert_eq!(stats.duplicates, 2);
        assert_eq!(fetcher.fetch_count("https://example.com/name/nm1/"), 1);
    }

    #[tokio::test]
    async fn test_failed_fetch_does_not_stop_crawl() {
        let fetcher = Arc::new(
            StaticFetcher::default()
                .with_page(
                    "https://example.com/title/tt1/fullcredits",
                    cast_page(&["/name/missing/", "/name/slow/", "/name/nm2/"]),
                )
                .with_page("https://example.com/name/nm2/", actor_page("John Roe", &["Movie C"]))
                .hanging_on("https://example.com/name/slow/"),
        );

        let handle = start(spider(), fetcher, open_filter(), &seed(), quick_config()).unwrap();
        let (records, stats) = collect(handle).await;

        assert_eq!(records, vec![OutputRecord::new(Some("John Roe".to_string()), "Movie C")]);
        assert_eq!(stats.failures, 2);
        assert_eq!(stats.pages, 2);
    }

    #[tokio::test]
    async fn test_filter_applies_to_follow_up_requests_only() {
        let fetcher = Arc::new(
            StaticFetcher::default()
                .with_page(
                    "https://example.com/title/tt1/fullcredits",
                    cast_page(&["/name/nm1/", "https://elsewhere.org/name/nm9/"]),
                )
                .with_page("https://example.com/name/nm1/", actor_page("Jane Doe", &["Movie A"])),
        );
        let filter = Arc::new(
            UrlFilter::new(UrlFilterConfig {
                allowed_domains: vec!["example.com".to_string()],
                ..UrlFilterConfig::default()
            })
            .unwrap(),
        );

        let handle = start(spider(), fetcher.clone(), filter, &seed(), quick_config()).unwrap();
        let (records, stats) = collect(handle).await;

        assert_eq!(records.len(), 1);
        assert_eq!(stats.filtered, 1);
        assert_eq!(fetcher.fetch_count("https://elsewhere.org/name/nm9/"), 0);
    }

    #[tokio::test]
    async fn test_total_timeout_closes_the_channel() {
        let fetcher = Arc::new(
            StaticFetcher::default().hanging_on("https://example.com/title/tt1/fullcredits"),
        );
        let config = EngineConfig {
            request_timeout: Duration::from_secs(3600),
            total_timeout: Some(Duration::from_millis(100)),
            ..quick_config()
        };

        let handle = start(spider(), fetcher, open_filter(), &seed(), config).unwrap();
        let (records, stats) = collect(handle).await;

        assert!(records.is_empty());
        assert!(stats.timed_out);
    }

    #[tokio::test]
    async fn test_no_seeds_finishes_immediately() {
        let fetcher = Arc::new(StaticFetcher::default());

        let handle = start(spider(), fetcher, open_filter(), &[], quick_config()).unwrap();
        let (records, stats) = collect(handle).await;

        assert!(records.is_empty());
        assert_eq!(stats, CrawlStats::default());
    }

    /// Answers every full-cast request with `anchors` actors and every actor page with one credit
    fn synthetic_page(url: &Url, anchors: usize) -> Page {
        let body = if url.path().ends_with("/fullcredits") {
            let hrefs: Vec<String> = (1..=anchors).map(|i| format!("/name/nm{i}/")).collect();
            let hrefs: Vec<&str> = hrefs.iter().map(String::as_str).collect();
            cast_page(&hrefs)
        } else {
            actor_page(url.path(), &["Movie A"])
        };
        Page::new(url.clone(), body)
    }

    /// One navigation at a time, like a single browser session
    struct SerialFetcher {
        session: tokio::sync::Mutex<()>,
        anchors: usize,
    }

    #[async_trait]
    impl Fetcher for SerialFetcher {
        async fn fetch(&self, url: &Url) -> Result<Page> {
            let _session = self.session.lock().await;
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok(synthetic_page(url, self.anchors))
        }

        fn concurrency_limit(&self) -> Option<usize> {
            Some(1)
        }
    }

    /// Records the highest number of fetches running at once
    struct PeakFetcher {
        running: AtomicUsize,
        peak: AtomicUsize,
        limit: Option<usize>,
        anchors: usize,
    }

    impl PeakFetcher {
        fn new(limit: Option<usize>, anchors: usize) -> Self {
            Self {
                running: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                limit,
                anchors,
            }
        }
    }

    #[async_trait]
    impl Fetcher for PeakFetcher {
        async fn fetch(&self, url: &Url) -> Result<Page> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.running.fetch_sub(1, Ordering::SeqCst);
            Ok(synthetic_page(url, self.anchors))
        }

        fn concurrency_limit(&self) -> Option<usize> {
            self.limit
        }
    }

    #[tokio::test]
    async fn test_serial_fetcher_loses_no_pages_to_queueing() {
        let fetcher = Arc::new(SerialFetcher {
            session: tokio::sync::Mutex::new(()),
            anchors: 8,
        });
        let config = EngineConfig {
            max_concurrency: 8,
            request_timeout: Duration::from_millis(350),
            total_timeout: None,
            channel_capacity: 16,
        };

        let handle = start(spider(), fetcher, open_filter(), &seed(), config).unwrap();
        let (records, stats) = collect(handle).await;

        assert_eq!(stats.failures, 0);
        assert_eq!(stats.pages, 9);
        assert_eq!(records.len(), 8);
    }

    #[tokio::test]
    async fn test_in_flight_fetches_bounded_by_max_concurrency() {
        let fetcher = Arc::new(PeakFetcher::new(None, 6));
        let config = EngineConfig {
            max_concurrency: 3,
            ..quick_config()
        };

        let handle = start(spider(), fetcher.clone(), open_filter(), &seed(), config).unwrap();
        let (records, _) = collect(handle).await;

        let peak = fetcher.peak.load(Ordering::SeqCst);
        assert_eq!(records.len(), 6);
        assert!(peak <= 3, "peak {peak} exceeded max_concurrency");
        assert!(peak > 1, "fetches never overlapped");
    }

    #[tokio::test]
    async fn test_fetcher_limit_caps_in_flight_fetches() {
        let fetcher = Arc::new(PeakFetcher::new(Some(2), 6));
        let config = EngineConfig {
            max_concurrency: 8,
            ..quick_config()
        };

        let handle = start(spider(), fetcher.clone(), open_filter(), &seed(), config).unwrap();
        let (records, _) = collect(handle).await;

        assert_eq!(records.len(), 6);
        assert_eq!(fetcher.peak.load(Ordering::SeqCst), 2);
    }
}
