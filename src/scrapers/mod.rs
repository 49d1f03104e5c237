//! Scraper implementations for web novel sources.
//!
//! Each supported website gets a `NovelSource` implementation describing how
//! to search, read novel metadata, and fetch chapter bodies. The shared
//! `NovelCrawler` drives those implementations through a two-tier fetch
//! strategy: plain HTTP first, a real browser when a site requires it.

pub mod browser;
pub mod crawler;
pub mod html;
mod http_client;
pub mod images;
pub mod source;
pub mod sources;

pub use browser::{BrowserEngineConfig, BrowserSession};
pub use crawler::NovelCrawler;
pub use http_client::HttpClient;
pub use source::NovelSource;

use thiserror::Error;

/// Errors that can occur while scraping a source.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Control-flow signal: the lightweight tier cannot serve this request
    /// and the caller should retry through the browser. Never surfaced to
    /// end users as a failure.
    #[error("Fallback to browser requested")]
    FallbackRequested,

    #[error("Browser engine unavailable: {0}")]
    ResourceUnavailable(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {code} for {url}")]
    Status { code: u16, url: String },

    #[error("Failed to parse page: {0}")]
    Parse(String),

    #[error("No crawler supports this URL: {0}")]
    UnsupportedUrl(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScrapeError {
    /// True when this error is the fallback signal rather than a real
    /// failure.
    pub fn is_fallback(&self) -> bool {
        matches!(self, ScrapeError::FallbackRequested)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_signal_is_not_a_failure() {
        assert!(ScrapeError::FallbackRequested.is_fallback());
        assert!(!ScrapeError::Parse("bad page".to_string()).is_fallback());
        assert!(!ScrapeError::ResourceUnavailable("no chrome".to_string()).is_fallback());
    }
}
