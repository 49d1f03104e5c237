//! The NovelSource trait shared by all per-site crawlers.

use async_trait::async_trait;

use super::browser::BrowserSession;
use super::http_client::HttpClient;
use super::ScrapeError;
use crate::models::{NovelInfo, SearchResult};

/// A site-specific crawler.
///
/// Every operation comes in two tiers. The lightweight tier works through
/// the plain HTTP client; its default implementations return the fallback
/// signal, so a site that only works through a real browser implements just
/// the browser tier. The `NovelCrawler` owns the tier switch: it catches the
/// fallback signal and re-runs the operation through the browser session, so
/// implementations never manage the browser lifecycle themselves.
#[async_trait]
pub trait NovelSource: Send + Sync {
    /// Short site name used in logs and CLI output.
    fn name(&self) -> &str;

    /// URL prefixes this crawler handles.
    fn base_urls(&self) -> &[&str];

    /// Search the site's catalog through plain HTTP.
    async fn search_in_lightweight(
        &self,
        _client: &HttpClient,
        _query: &str,
    ) -> Result<Vec<SearchResult>, ScrapeError> {
        Err(ScrapeError::FallbackRequested)
    }

    /// Read novel metadata and the chapter list through plain HTTP.
    ///
    /// Returns a complete `NovelInfo`; partial results are never surfaced.
    async fn read_info_in_lightweight(
        &self,
        _client: &HttpClient,
        _url: &str,
    ) -> Result<NovelInfo, ScrapeError> {
        Err(ScrapeError::FallbackRequested)
    }

    /// Fetch one chapter's body text through plain HTTP.
    async fn download_body_in_lightweight(
        &self,
        _client: &HttpClient,
        _chapter_url: &str,
    ) -> Result<String, ScrapeError> {
        Err(ScrapeError::FallbackRequested)
    }

    /// Search the site's catalog through the browser.
    ///
    /// Sites without a usable search page keep the default, which reports
    /// no results.
    async fn search_in_browser(
        &self,
        _browser: &mut BrowserSession,
        _query: &str,
    ) -> Result<Vec<SearchResult>, ScrapeError> {
        Ok(Vec::new())
    }

    /// Read novel metadata and the chapter list through the browser.
    async fn read_info_in_browser(
        &self,
        browser: &mut BrowserSession,
        url: &str,
    ) -> Result<NovelInfo, ScrapeError>;

    /// Fetch one chapter's body text through the browser.
    async fn download_body_in_browser(
        &self,
        browser: &mut BrowserSession,
        chapter_url: &str,
    ) -> Result<String, ScrapeError>;

    /// Whether this crawler handles the given URL.
    fn supports(&self, url: &str) -> bool {
        self.base_urls()
            .iter()
            .any(|base| url.starts_with(base))
    }
}
