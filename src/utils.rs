use crate::error::{CrawlError, Result};
use url::Url;

/// Parse an absolute location, keeping the offending input in the error
pub fn parse_location(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|source| CrawlError::InvalidUrl {
        url: raw.to_string(),
        source,
    })
}

/// Join a relative path onto a base location using standard reference resolution
pub fn join_location(base: &Url, path: &str) -> Result<Url> {
    base.join(path).map_err(|source| CrawlError::InvalidUrl {
        url: path.to_string(),
        source,
    })
}
