use serde::{Deserialize, Serialize};
use url::Url;

/// One credit on an actor's filmography page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRecord {
    /// Name from the page header, `None` when the header is missing
    pub actor: Option<String>,

    /// Credit title text
    pub title: String,
}

impl OutputRecord {
    /// Create a new record
    pub fn new(actor: Option<String>, title: impl Into<String>) -> Self {
        Self {
            actor,
            title: title.into(),
        }
    }
}

/// A fetched document and the location it was finally served from
#[derive(Debug, Clone)]
pub struct Page {
    /// Location after redirects; relative links are joined against this
    pub url: Url,

    /// Raw markup
    pub body: String,
}

impl Page {
    pub fn new(url: Url, body: impl Into<String>) -> Self {
        Self {
            url,
            body: body.into(),
        }
    }
}
