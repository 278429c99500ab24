//! Page handlers for the title → full cast → filmography walk.
//!
//! Each handler turns one fetched page into follow-up requests and output
//! records. They do no I/O; the engine in [`crate::crawlers::engine`] fetches
//! pages and routes them back here by [`Callback`].

use crate::config::SelectorConfig;
use crate::error::Result;
use crate::parsers::{Selectors, html};
use crate::results::{OutputRecord, Page};
use crate::utils::join_location;
use url::Url;

/// Path joined onto a title page to reach its full-cast page
pub const FULL_CREDITS_PATH: &str = "fullcredits";

/// Which handler receives a fetched page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Callback {
    /// Full-cast page of a title
    FullCredits,
    /// Personal filmography page of a cast member
    ActorPage,
}

/// A location to fetch and the handler for its response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub url: Url,
    pub callback: Callback,
}

impl Request {
    pub fn new(url: Url, callback: Callback) -> Self {
        Self { url, callback }
    }
}

/// Everything a handler yields for one page
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ParseOutput {
    pub requests: Vec<Request>,
    pub records: Vec<OutputRecord>,
}

/// Spider walking a title's cast to each actor's credits
#[derive(Debug, Clone)]
pub struct CreditSpider {
    selectors: Selectors,
}

impl CreditSpider {
    /// Build a spider from selector configuration
    pub fn new(config: &SelectorConfig) -> Result<Self> {
        Ok(Self {
            selectors: Selectors::compile(config)?,
        })
    }

    /// Request for the full-cast page of `seed`
    pub fn start_crawl(&self, seed: &Url) -> Result<Request> {
        let next_page = join_location(seed, FULL_CREDITS_PATH)?;
        Ok(Request::new(next_page, Callback::FullCredits))
    }

    /// One full-cast request per seed
    pub fn start_requests(&self, seeds: &[Url]) -> Result<Vec<Request>> {
        seeds.iter().map(|seed| self.start_crawl(seed)).collect()
    }

    /// Route a fetched page to the handler named by `callback`
    pub fn parse(&self, callback: Callback, page: &Page) -> ParseOutput {
        match callback {
            Callback::FullCredits => ParseOutput {
                requests: self.handle_cast_page(&page.body, &page.url),
                records: Vec::new(),
            },
            Callback::ActorPage => ParseOutput {
                requests: Vec::new(),
                records: self.handle_actor_page(&page.body),
            },
        }
    }

    /// One actor-page request per headshot anchor, joined against the page's
    /// `<base href>` when present, otherwise against `current`
    pub fn handle_cast_page(&self, body: &str, current: &Url) -> Vec<Request> {
        let doc = html::parse_document(body);
        let base = html::attr_values(&doc, &self.selectors.base, "href")
            .first()
            .and_then(|href| join_location(current, href).ok())
            .unwrap_or_else(|| current.clone());
        let actor_list = html::attr_values(&doc, &self.selectors.cast_link, &self.selectors.link_attr);

        let mut requests = Vec::with_capacity(actor_list.len());
        for actor in actor_list {
            match join_location(&base, &actor) {
                Ok(actor_page) => requests.push(Request::new(actor_page, Callback::ActorPage)),
                Err(e) => ::log::debug!("Skipping cast link on {}: {}", current, e),
            }
        }

        ::log::info!("Found {} cast members on {}", requests.len(), current);
        requests
    }

    /// One record per credit, each paired with the header name
    pub fn handle_actor_page(&self, body: &str) -> Vec<OutputRecord> {
        let doc = html::parse_document(body);
        let actor_name = html::first_text(&doc, &self.selectors.actor_name);
        let credits = html::all_text(&doc, &self.selectors.credit_title);

        if actor_name.is_none() {
            ::log::debug!("Actor page has no name header; emitting credits without a name");
        }

        credits
            .into_iter()
            .map(|title| OutputRecord::new(actor_name.clone(), title))
            .collect()
    }
}
