//! Crawler for foxaholic.com, a Madara-skin site behind aggressive bot
//! protection.
//!
//! Plain HTTP usually gets a protection interstitial, so the lightweight
//! tier escalates protection statuses and unparseable pages instead of
//! failing. Search, metadata and chapter bodies all work through the
//! browser tier.

use async_trait::async_trait;
use scraper::{Html, Selector};

use crate::models::{NovelInfo, SearchResult};
use crate::scrapers::browser::BrowserSession;
use crate::scrapers::html::{absolute_url, clean_contents, element_text};
use crate::scrapers::http_client::HttpClient;
use crate::scrapers::source::NovelSource;
use crate::scrapers::ScrapeError;

const CHAPTER_LINKS: &str = ".wp-manga-chapter.free-chap a";
const BODY_CONTAINER: &str = ".entry-content_wrap";

pub struct Foxaholic;

#[async_trait]
impl NovelSource for Foxaholic {
    fn name(&self) -> &str {
        "foxaholic"
    }

    fn base_urls(&self) -> &[&str] {
        &[
            "https://foxaholic.com/",
            "https://www.foxaholic.com/",
            "https://18.foxaholic.com/",
            "https://global.foxaholic.com/",
        ]
    }

    async fn read_info_in_lightweight(
        &self,
        client: &HttpClient,
        url: &str,
    ) -> Result<NovelInfo, ScrapeError> {
        let html = client.get_html(url).await.map_err(escalate_protection)?;
        // Interstitials come back 200 without any of the catalog markup,
        // so a parse failure on this tier means "try the browser".
        match parse_info(&html, url) {
            Err(ScrapeError::Parse(_)) => Err(ScrapeError::FallbackRequested),
            other => other,
        }
    }

    async fn download_body_in_lightweight(
        &self,
        client: &HttpClient,
        chapter_url: &str,
    ) -> Result<String, ScrapeError> {
        let html = client
            .get_html(chapter_url)
            .await
            .map_err(escalate_protection)?;
        match parse_body(&html, chapter_url) {
            Err(ScrapeError::Parse(_)) => Err(ScrapeError::FallbackRequested),
            other => other,
        }
    }

    async fn search_in_browser(
        &self,
        browser: &mut BrowserSession,
        query: &str,
    ) -> Result<Vec<SearchResult>, ScrapeError> {
        let url = format!(
            "https://foxaholic.com/?s={}&post_type=wp-manga",
            urlencoding::encode(query)
        );
        let html = browser.fetch_html(&url, Some(".c-tabs-item__content")).await?;
        Ok(parse_search(&html, &url))
    }

    async fn read_info_in_browser(
        &self,
        browser: &mut BrowserSession,
        url: &str,
    ) -> Result<NovelInfo, ScrapeError> {
        let html = browser.fetch_html(url, Some(CHAPTER_LINKS)).await?;
        parse_info(&html, url)
    }

    async fn download_body_in_browser(
        &self,
        browser: &mut BrowserSession,
        chapter_url: &str,
    ) -> Result<String, ScrapeError> {
        let html = browser.fetch_html(chapter_url, Some(BODY_CONTAINER)).await?;
        parse_body(&html, chapter_url)
    }
}

/// The bot protection answers plain HTTP clients with 403 or 503.
fn escalate_protection(e: ScrapeError) -> ScrapeError {
    match e {
        ScrapeError::Status {
            code: 403 | 503, ..
        } => ScrapeError::FallbackRequested,
        other => other,
    }
}

fn parse_info(html: &str, page_url: &str) -> Result<NovelInfo, ScrapeError> {
    let doc = Html::parse_document(html);
    let title_sel = Selector::parse(".post-title h1").unwrap();
    let cover_sel = Selector::parse(".summary_image a img").unwrap();
    let author_sel = Selector::parse(".author-content a[href]").unwrap();
    let chapter_sel = Selector::parse(CHAPTER_LINKS).unwrap();

    let title = doc
        .select(&title_sel)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ScrapeError::Parse("novel title not found".to_string()))?;

    let cover_url = doc
        .select(&cover_sel)
        .next()
        .and_then(|img| {
            img.value()
                .attr("data-src")
                .or_else(|| img.value().attr("src"))
        })
        .and_then(|src| absolute_url(page_url, src));

    let authors: Vec<String> = doc
        .select(&author_sel)
        .map(element_text)
        .filter(|t| !t.is_empty())
        .collect();

    let mut info = NovelInfo {
        title,
        author: (!authors.is_empty()).then(|| authors.join(" ")),
        cover_url,
        ..Default::default()
    };

    let links: Vec<_> = doc.select(&chapter_sel).collect();
    if links.is_empty() {
        return Err(ScrapeError::Parse("chapter list not found".to_string()));
    }
    // The site lists chapters newest first.
    for a in links.into_iter().rev() {
        let href = match a.value().attr("href") {
            Some(h) => h,
            None => continue,
        };
        let url = match absolute_url(page_url, href) {
            Some(u) => u,
            None => continue,
        };
        info.push_chapter(element_text(a), url);
    }

    Ok(info)
}

fn parse_body(html: &str, page_url: &str) -> Result<String, ScrapeError> {
    let doc = Html::parse_document(html);
    let sel = Selector::parse(BODY_CONTAINER).unwrap();
    let container = doc
        .select(&sel)
        .next()
        .ok_or_else(|| ScrapeError::Parse("chapter content not found".to_string()))?;
    Ok(clean_contents(container, page_url, &[]))
}

fn parse_search(html: &str, page_url: &str) -> Vec<SearchResult> {
    let doc = Html::parse_document(html);
    let tab_sel = Selector::parse(".c-tabs-item__content").unwrap();
    let link_sel = Selector::parse(".post-title h3 a").unwrap();
    let latest_sel = Selector::parse(".latest-chap .chapter a").unwrap();

    let mut results = Vec::new();
    for tab in doc.select(&tab_sel) {
        let a = match tab.select(&link_sel).next() {
            Some(a) => a,
            None => continue,
        };
        let url = match a
            .value()
            .attr("href")
            .and_then(|href| absolute_url(page_url, href))
        {
            Some(u) => u,
            None => continue,
        };
        let latest = tab
            .select(&latest_sel)
            .next()
            .map(element_text)
            .filter(|t| !t.is_empty());
        results.push(SearchResult {
            title: element_text(a),
            url,
            info: latest,
        });
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOVEL_PAGE: &str = r#"
        <div class="post-title"><h1>Reborn as a Fox</h1></div>
        <div class="summary_image">
            <a href="/novel/reborn-as-a-fox/"><img src="/covers/fox.jpg"></a>
        </div>
        <div class="author-content">
            <a href="/author/kitsune/">Kitsune</a>
        </div>
        <ul>
            <li class="wp-manga-chapter free-chap"><a href="/novel/fox/chapter-2/">Chapter 2</a></li>
            <li class="wp-manga-chapter free-chap"><a href="/novel/fox/chapter-1/">Chapter 1</a></li>
        </ul>
    "#;

    #[test]
    fn test_parse_info_reverses_chapter_order() {
        let info = parse_info(NOVEL_PAGE, "https://foxaholic.com/novel/fox/").unwrap();
        assert_eq!(info.title, "Reborn as a Fox");
        assert_eq!(info.author.as_deref(), Some("Kitsune"));
        assert_eq!(
            info.cover_url.as_deref(),
            Some("https://foxaholic.com/covers/fox.jpg")
        );

        assert_eq!(info.chapters.len(), 2);
        assert_eq!(info.chapters[0].title, "Chapter 1");
        assert_eq!(info.chapters[0].id, 1);
        assert_eq!(info.chapters[0].volume, 1);
        assert_eq!(info.chapters[1].title, "Chapter 2");
        assert_eq!(info.volumes.len(), 1);
    }

    #[test]
    fn test_parse_info_without_chapters_is_parse_error() {
        let html = r#"<div class="post-title"><h1>Empty</h1></div>"#;
        let err = parse_info(html, "https://foxaholic.com/novel/empty/").unwrap_err();
        assert!(matches!(err, ScrapeError::Parse(_)));
    }

    #[test]
    fn test_parse_body_extracts_container() {
        let html = r#"
            <div class="entry-content_wrap">
                <p>The fox ran.</p>
                <p>The hound followed.</p>
            </div>
        "#;
        let body = parse_body(html, "https://foxaholic.com/novel/fox/chapter-1/").unwrap();
        assert_eq!(body, "<p>The fox ran.</p>\n<p>The hound followed.</p>");
    }

    #[test]
    fn test_protection_statuses_escalate() {
        let err = escalate_protection(ScrapeError::Status {
            code: 403,
            url: "https://foxaholic.com/".to_string(),
        });
        assert!(err.is_fallback());

        let err = escalate_protection(ScrapeError::Status {
            code: 404,
            url: "https://foxaholic.com/".to_string(),
        });
        assert!(!err.is_fallback());
    }

    #[test]
    fn test_parse_search_results() {
        let html = r#"
            <div class="c-tabs-item__content">
                <div class="post-title"><h3><a href="/novel/fox/">Reborn as a Fox</a></h3></div>
                <div class="latest-chap"><span class="chapter"><a href="/novel/fox/chapter-9/">Chapter 9</a></span></div>
            </div>
            <div class="c-tabs-item__content">
                <div class="post-title"><h3><a href="/novel/hound/">The Hound</a></h3></div>
            </div>
        "#;
        let results = parse_search(html, "https://foxaholic.com/?s=fox&post_type=wp-manga");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "Reborn as a Fox");
        assert_eq!(results[0].url, "https://foxaholic.com/novel/fox/");
        assert_eq!(results[0].info.as_deref(), Some("Chapter 9"));
        assert_eq!(results[1].info, None);
    }
}
