use clap::Parser;
use credit_crawl::sink::{self, RecordSink};
use credit_crawl::{Crawl, CrawlConfig, CrawlStats, Result};
use tokio::task::JoinHandle;

mod args;
use args::Args;

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::init();

    let args = Args::parse();

    if let Err(e) = run(args).await {
        ::log::error!("Crawl failed: {}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    // Precedence: CLI > environment > config file > defaults
    let mut config = match &args.config {
        Some(path) => CrawlConfig::from_file(path)?,
        None => CrawlConfig::default(),
    };
    config.apply_env();

    let mut crawl = Crawl::new().with_config(config);
    if !args.seeds.is_empty() {
        crawl = crawl.with_seeds(args.seeds.clone());
    }
    if let Some(concurrency) = args.concurrency {
        crawl = crawl.with_max_concurrency(concurrency);
    }
    if let Some(fetcher) = args.fetcher {
        crawl = crawl.with_fetcher(fetcher.into());
    }
    if let Some(url) = &args.webdriver_url {
        crawl = crawl.with_webdriver_url(url);
    }
    if let Some(secs) = args.request_timeout {
        crawl = crawl.with_request_timeout(secs);
    }
    if let Some(secs) = args.total_timeout {
        crawl = crawl.with_total_timeout(secs);
    }
    if let Some(user_agent) = &args.user_agent {
        crawl = crawl.with_user_agent(user_agent);
    }

    ::log::info!("Starting crawl for: {}", crawl.config().start_urls.join(", "));

    let format = args.output_format();
    let mut sink = match &args.output {
        Some(path) => RecordSink::create(path, format)?,
        None => RecordSink::stdout(format),
    };

    let start_time = std::time::Instant::now();
    let mut handle = crawl.generate()?;

    // A write failure drops the receiver, which stops the dispatcher
    let written = sink::drain(&mut handle.records, &mut sink).await?;
    sink.finish()?;

    let stats = await_stats(handle.stats).await;
    ::log::info!(
        "Crawling complete - {} records from {} pages ({} failed) in {:.2} seconds",
        written,
        stats.pages,
        stats.failures,
        start_time.elapsed().as_secs_f64()
    );

    Ok(())
}

/// Final counters, or zeroes with a warning when the crawl task panicked or was cancelled
async fn await_stats(stats: JoinHandle<CrawlStats>) -> CrawlStats {
    match stats.await {
        Ok(stats) => stats,
        Err(e) => {
            ::log::warn!("Crawl task did not finish cleanly, stats unavailable: {}", e);
            CrawlStats::default()
        }
    }
}
