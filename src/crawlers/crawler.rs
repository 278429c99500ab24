use crate::error::Result;
use crate::results::Page;
use async_trait::async_trait;
use url::Url;

/// Backend that turns a location into a fetched page
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `url`, returning the body and the location it was served from
    async fn fetch(&self, url: &Url) -> Result<Page>;

    /// Most fetches this backend can serve at once without queueing internally.
    /// The engine never keeps more than this many in flight.
    fn concurrency_limit(&self) -> Option<usize> {
        None
    }

    /// Release any resources held by the backend
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
