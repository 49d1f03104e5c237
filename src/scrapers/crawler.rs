//! The crawl driver: two-tier fetches, chapter loop, and browser lifecycle.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::browser::BrowserSession;
use super::http_client::HttpClient;
use super::images::find_images;
use super::source::NovelSource;
use super::ScrapeError;
use crate::config::Settings;
use crate::models::{CrawlSession, SearchResult};

/// Progress event emitted once per chapter the download loop passes over,
/// including chapters skipped because a previous run already fetched them.
#[derive(Debug, Clone)]
pub struct ChapterProgress {
    pub chapter_id: u32,
    pub title: String,
    /// Chapter count of the whole session, for sizing progress displays.
    pub total: usize,
    pub success: bool,
    pub skipped: bool,
}

/// Drives one site crawler against one novel.
///
/// Owns the HTTP client, the browser session, and the crawl state. The
/// browser session is opened and closed by the operations that need it;
/// callers never manage it directly.
pub struct NovelCrawler {
    source: Arc<dyn NovelSource>,
    client: HttpClient,
    browser: BrowserSession,
    pub session: CrawlSession,
}

impl NovelCrawler {
    pub fn new(source: Arc<dyn NovelSource>, settings: &Settings, novel_url: &str) -> Self {
        Self {
            source,
            client: HttpClient::from_settings(settings),
            browser: BrowserSession::new(settings.browser.clone()),
            session: CrawlSession::new(novel_url),
        }
    }

    /// The site crawler this driver wraps.
    pub fn source(&self) -> &dyn NovelSource {
        self.source.as_ref()
    }

    /// Search the site's catalog.
    ///
    /// Runs the lightweight search first; when the site signals fallback,
    /// the browser session is opened for the browser-backed search and
    /// closed again before returning, success or not.
    pub async fn search(&mut self, query: &str) -> Result<Vec<SearchResult>, ScrapeError> {
        match self.source.search_in_lightweight(&self.client, query).await {
            Ok(results) => Ok(results),
            Err(e) if e.is_fallback() => {
                debug!("Search on {} falling back to browser", self.source.name());
                self.browser.ensure_open().await?;
                let result = self.source.search_in_browser(&mut self.browser, query).await;
                self.browser.close().await;
                result
            }
            Err(e) => Err(e),
        }
    }

    /// Discover novel metadata and the chapter list into the session.
    ///
    /// Either tier produces a complete table of contents which replaces the
    /// session's previous one wholesale; a fallback never leaves a mixture
    /// of the two discovery orders behind.
    pub async fn read_info(&mut self) -> Result<(), ScrapeError> {
        let url = self.session.novel_url.clone();

        match self.source.read_info_in_lightweight(&self.client, &url).await {
            Ok(info) => {
                self.session.apply_info(info);
                Ok(())
            }
            Err(e) if e.is_fallback() => {
                debug!("Metadata for {} falling back to browser", url);
                self.session.clear_toc();
                self.browser.ensure_open().await?;
                let result = self.source.read_info_in_browser(&mut self.browser, &url).await;
                self.browser.close().await;
                self.session.apply_info(result?);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Download every pending chapter body into the session.
    ///
    /// The browser session is opened once up front and closed exactly once
    /// when the loop finishes, whether it ran to completion or was
    /// interrupted. One progress event is emitted per chapter passed over.
    pub async fn download_chapters(
        &mut self,
        cancel: &CancellationToken,
        progress: mpsc::UnboundedSender<ChapterProgress>,
    ) -> Result<(), ScrapeError> {
        self.browser.ensure_open().await?;
        self.run_chapter_loop(cancel, &progress).await;
        self.browser.close().await;
        Ok(())
    }

    /// Download an image through the browser, opening the session if
    /// needed. The session stays open so a batch of images shares one
    /// browser; callers close it via `close_browser` when the batch ends.
    pub async fn download_image(&mut self, url: &str) -> Result<Vec<u8>, ScrapeError> {
        self.browser.ensure_open().await?;
        self.browser.fetch_image(url).await
    }

    /// Close the browser session if it is open.
    pub async fn close_browser(&mut self) {
        self.browser.close().await;
    }

    async fn run_chapter_loop(
        &mut self,
        cancel: &CancellationToken,
        progress: &mpsc::UnboundedSender<ChapterProgress>,
    ) {
        let total = self.session.chapters.len();
        for idx in 0..total {
            if cancel.is_cancelled() {
                info!("Chapter download interrupted, stopping");
                break;
            }

            // Chapters fetched by a previous run still count toward
            // progress but are never re-fetched or re-marked.
            if self.session.chapters[idx].is_downloaded() {
                let chapter = &self.session.chapters[idx];
                let _ = progress.send(ChapterProgress {
                    chapter_id: chapter.id,
                    title: chapter.title.clone(),
                    total,
                    success: true,
                    skipped: true,
                });
                continue;
            }

            let url = self.session.chapters[idx].url.clone();
            let success = match self.fetch_chapter_body(&url).await {
                Ok(body) => {
                    let images = find_images(&body, &url);
                    let chapter = &mut self.session.chapters[idx];
                    chapter.body = body;
                    chapter.images = images;
                    chapter.success = Some(true);
                    true
                }
                Err(e) => {
                    warn!("Failed to download chapter {}: {}", url, e);
                    let chapter = &mut self.session.chapters[idx];
                    chapter.body = String::new();
                    chapter.success = Some(false);
                    false
                }
            };

            let chapter = &self.session.chapters[idx];
            let _ = progress.send(ChapterProgress {
                chapter_id: chapter.id,
                title: chapter.title.clone(),
                total,
                success,
                skipped: false,
            });
        }
    }

    /// Fetch one chapter body, lightweight first. The fallback path expects
    /// the browser session to be open already; the chapter loop opens it
    /// before the first fetch rather than paying open/close per chapter.
    async fn fetch_chapter_body(&mut self, url: &str) -> Result<String, ScrapeError> {
        match self
            .source
            .download_body_in_lightweight(&self.client, url)
            .await
        {
            Ok(body) => Ok(body),
            Err(e) if e.is_fallback() => {
                debug!("Chapter {} falling back to browser", url);
                self.source
                    .download_body_in_browser(&mut self.browser, url)
                    .await
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NovelInfo, SearchResult};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted site crawler: per-URL lightweight outcomes, fixed browser
    /// answers, and counters for how often each tier ran.
    #[derive(Default)]
    struct ScriptedSource {
        lightweight_bodies: std::collections::HashMap<String, Result<String, &'static str>>,
        browser_body: Option<String>,
        lightweight_calls: AtomicUsize,
        browser_calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn lightweight_ok(mut self, url: &str, body: &str) -> Self {
            self.lightweight_bodies
                .insert(url.to_string(), Ok(body.to_string()));
            self
        }

        fn lightweight_fallback(mut self, url: &str) -> Self {
            self.lightweight_bodies
                .insert(url.to_string(), Err("fallback"));
            self
        }

        fn lightweight_error(mut self, url: &str) -> Self {
            self.lightweight_bodies.insert(url.to_string(), Err("parse"));
            self
        }

        fn browser_body(mut self, body: &str) -> Self {
            self.browser_body = Some(body.to_string());
            self
        }
    }

    #[async_trait]
    impl NovelSource for ScriptedSource {
        fn name(&self) -> &str {
            "scripted"
        }

        fn base_urls(&self) -> &[&str] {
            &["https://scripted.example.com/"]
        }

        async fn download_body_in_lightweight(
            &self,
            _client: &HttpClient,
            chapter_url: &str,
        ) -> Result<String, ScrapeError> {
            self.lightweight_calls.fetch_add(1, Ordering::SeqCst);
            match self.lightweight_bodies.get(chapter_url) {
                Some(Ok(body)) => Ok(body.clone()),
                Some(Err("fallback")) => Err(ScrapeError::FallbackRequested),
                Some(Err(msg)) => Err(ScrapeError::Parse(msg.to_string())),
                None => Err(ScrapeError::Parse("unscripted url".to_string())),
            }
        }

        async fn read_info_in_browser(
            &self,
            _browser: &mut BrowserSession,
            _url: &str,
        ) -> Result<NovelInfo, ScrapeError> {
            let mut info = NovelInfo {
                title: "Scripted Novel".to_string(),
                ..Default::default()
            };
            info.push_chapter("One", "https://scripted.example.com/1");
            Ok(info)
        }

        async fn download_body_in_browser(
            &self,
            _browser: &mut BrowserSession,
            _chapter_url: &str,
        ) -> Result<String, ScrapeError> {
            self.browser_calls.fetch_add(1, Ordering::SeqCst);
            match &self.browser_body {
                Some(body) => Ok(body.clone()),
                None => Err(ScrapeError::Parse("no browser body scripted".to_string())),
            }
        }
    }

    fn crawler_with(source: ScriptedSource) -> (NovelCrawler, Arc<ScriptedSource>) {
        let source = Arc::new(source);
        let crawler = NovelCrawler::new(
            source.clone(),
            &Settings::default(),
            "https://scripted.example.com/novel/1",
        );
        (crawler, source)
    }

    fn chapter(id: u32, url: &str) -> crate::models::Chapter {
        crate::models::Chapter {
            id,
            volume: 1,
            title: format!("Chapter {}", id),
            url: url.to_string(),
            body: String::new(),
            success: None,
            images: Vec::new(),
        }
    }

    fn drain(
        rx: &mut mpsc::UnboundedReceiver<ChapterProgress>,
    ) -> Vec<ChapterProgress> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_loop_resumes_and_falls_back_per_chapter() {
        let source = ScriptedSource::default()
            .lightweight_fallback("https://scripted.example.com/2")
            .browser_body("B");
        let (mut crawler, source) = crawler_with(source);

        let mut done = chapter(1, "https://scripted.example.com/1");
        done.body = "A".to_string();
        done.success = Some(true);
        crawler.session.chapters.push(done);
        crawler
            .session
            .chapters
            .push(chapter(2, "https://scripted.example.com/2"));

        let cancel = CancellationToken::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        crawler.run_chapter_loop(&cancel, &tx).await;

        // Chapter 1 untouched, chapter 2 filled from the browser tier.
        assert_eq!(crawler.session.chapters[0].body, "A");
        assert_eq!(crawler.session.chapters[1].body, "B");
        assert_eq!(crawler.session.chapters[1].success, Some(true));

        // The finished chapter was never re-fetched.
        assert_eq!(source.lightweight_calls.load(Ordering::SeqCst), 1);
        assert_eq!(source.browser_calls.load(Ordering::SeqCst), 1);

        let events = drain(&mut rx);
        assert_eq!(events.len(), 2);
        assert!(events[0].skipped);
        assert!(!events[1].skipped);
        assert!(events[1].success);
    }

    #[tokio::test]
    async fn test_loop_downgrades_chapter_errors_and_continues() {
        let source = ScriptedSource::default()
            .lightweight_error("https://scripted.example.com/1")
            .lightweight_ok("https://scripted.example.com/2", "Two");
        let (mut crawler, _source) = crawler_with(source);

        crawler
            .session
            .chapters
            .push(chapter(1, "https://scripted.example.com/1"));
        crawler
            .session
            .chapters
            .push(chapter(2, "https://scripted.example.com/2"));

        let cancel = CancellationToken::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        crawler.run_chapter_loop(&cancel, &tx).await;

        assert_eq!(crawler.session.chapters[0].body, "");
        assert_eq!(crawler.session.chapters[0].success, Some(false));
        assert_eq!(crawler.session.chapters[1].body, "Two");
        assert_eq!(crawler.session.chapters[1].success, Some(true));

        let events = drain(&mut rx);
        assert_eq!(events.len(), 2);
        assert!(!events[0].success);
        assert!(events[1].success);
    }

    #[tokio::test]
    async fn test_loop_stops_on_cancellation() {
        let source =
            ScriptedSource::default().lightweight_ok("https://scripted.example.com/1", "One");
        let (mut crawler, source) = crawler_with(source);

        crawler
            .session
            .chapters
            .push(chapter(1, "https://scripted.example.com/1"));
        crawler
            .session
            .chapters
            .push(chapter(2, "https://scripted.example.com/2"));

        let cancel = CancellationToken::new();
        cancel.cancel();
        let (tx, mut rx) = mpsc::unbounded_channel();
        crawler.run_chapter_loop(&cancel, &tx).await;

        // Nothing processed, nothing marked.
        assert_eq!(source.lightweight_calls.load(Ordering::SeqCst), 0);
        assert_eq!(crawler.session.chapters[0].success, None);
        assert_eq!(crawler.session.chapters[1].success, None);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_images_extracted_from_downloaded_body() {
        let body = r#"<p>Scene.</p><img src="https://cdn.example.com/a.png">"#;
        let source =
            ScriptedSource::default().lightweight_ok("https://scripted.example.com/1", body);
        let (mut crawler, _source) = crawler_with(source);

        crawler
            .session
            .chapters
            .push(chapter(1, "https://scripted.example.com/1"));

        let cancel = CancellationToken::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        crawler.run_chapter_loop(&cancel, &tx).await;

        let images = &crawler.session.chapters[0].images;
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].url, "https://cdn.example.com/a.png");
    }

    #[tokio::test]
    async fn test_search_results_pass_through_lightweight() {
        struct SearchSource;

        #[async_trait]
        impl NovelSource for SearchSource {
            fn name(&self) -> &str {
                "search"
            }
            fn base_urls(&self) -> &[&str] {
                &["https://search.example.com/"]
            }
            async fn search_in_lightweight(
                &self,
                _client: &HttpClient,
                query: &str,
            ) -> Result<Vec<SearchResult>, ScrapeError> {
                Ok(vec![SearchResult {
                    title: format!("Result for {}", query),
                    url: "https://search.example.com/novel/1".to_string(),
                    info: None,
                }])
            }
            async fn read_info_in_browser(
                &self,
                _browser: &mut BrowserSession,
                _url: &str,
            ) -> Result<NovelInfo, ScrapeError> {
                Ok(NovelInfo::default())
            }
            async fn download_body_in_browser(
                &self,
                _browser: &mut BrowserSession,
                _chapter_url: &str,
            ) -> Result<String, ScrapeError> {
                Ok(String::new())
            }
        }

        let mut crawler = NovelCrawler::new(
            Arc::new(SearchSource),
            &Settings::default(),
            "https://search.example.com/",
        );
        let results = crawler.search("dao").await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Result for dao");
    }
}
