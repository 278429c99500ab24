pub mod crawler;
pub mod engine;
pub mod http;
pub mod web;

pub use crawler::Fetcher;
pub use http::HttpFetcher;
pub use web::WebDriverFetcher;
