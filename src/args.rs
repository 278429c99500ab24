use clap::Parser;
use credit_crawl::FetcherKind;
use credit_crawl::sink::OutputFormat;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "credit-crawl")]
#[command(about = "Crawls a title's full cast and emits every (actor, credit) pair")]
#[command(version)]
pub struct Args {
    /// Title pages to start from (defaults to the configured seeds)
    pub seeds: Vec<String>,

    /// Write records to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format (inferred from the output extension when omitted)
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// JSON configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Number of concurrent fetches
    #[arg(short, long)]
    pub concurrency: Option<usize>,

    /// Fetch backend
    #[arg(long, value_enum)]
    pub fetcher: Option<FetcherArg>,

    /// WebDriver server for the webdriver fetcher
    #[arg(long)]
    pub webdriver_url: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub request_timeout: Option<u64>,

    /// Total timeout in seconds (maximum runtime)
    #[arg(long)]
    pub total_timeout: Option<u64>,

    /// User agent for the HTTP fetcher
    #[arg(long)]
    pub user_agent: Option<String>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum FetcherArg {
    Http,
    Webdriver,
}

impl From<FetcherArg> for FetcherKind {
    fn from(arg: FetcherArg) -> Self {
        match arg {
            FetcherArg::Http => FetcherKind::Http,
            FetcherArg::Webdriver => FetcherKind::WebDriver,
        }
    }
}

impl Args {
    /// Output format: explicit flag, then file extension, then CSV
    pub fn output_format(&self) -> OutputFormat {
        self.format
            .or_else(|| self.output.as_deref().and_then(OutputFormat::from_path))
            .unwrap_or_default()
    }
}
