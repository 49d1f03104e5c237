//! Crawler for m.shuhaige.net, a mobile site with paginated chapter lists.
//!
//! The chapter list lives on separate pages (`{id}/`, `{id}_2/`, ...)
//! discovered through the pager's next-page link. Synopsis and chapter
//! bodies carry promotional lines that get filtered out.

use async_trait::async_trait;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::models::{NovelInfo, SearchResult};
use crate::scrapers::browser::BrowserSession;
use crate::scrapers::html::{absolute_url, clean_contents, element_text};
use crate::scrapers::http_client::HttpClient;
use crate::scrapers::source::NovelSource;
use crate::scrapers::ScrapeError;

const PROMO_MARKERS: &[&str] = &[
    "这章没有结束",
    "无错的章节将持续",
    "书海阁小说网更新速度全网最快",
];

const SYNOPSIS_MARKERS: &[&str] = &["是一名出色的小说作者", "最新章节"];

pub struct Shuhaige;

#[async_trait]
impl NovelSource for Shuhaige {
    fn name(&self) -> &str {
        "shuhaige"
    }

    fn base_urls(&self) -> &[&str] {
        &["https://m.shuhaige.net/"]
    }

    /// The mobile site has no search endpoint.
    async fn search_in_lightweight(
        &self,
        _client: &HttpClient,
        _query: &str,
    ) -> Result<Vec<SearchResult>, ScrapeError> {
        Ok(Vec::new())
    }

    async fn read_info_in_lightweight(
        &self,
        client: &HttpClient,
        url: &str,
    ) -> Result<NovelInfo, ScrapeError> {
        let book_id =
            book_id_from(url).ok_or_else(|| ScrapeError::UnsupportedUrl(url.to_string()))?;

        // Both the novel URL and a chapter-list URL identify the book; the
        // detail page is always fetched from the canonical novel URL.
        let novel_url = novel_page_url(&book_id);
        let html = client.get_html(&novel_url).await?;
        let mut info = parse_detail(&html, &novel_url)?;

        let mut page = 1u32;
        loop {
            let url = list_url(&book_id, page);
            let listing = client.get_html(&url).await?;
            let parsed = parse_chapter_page(&listing, &url, page);
            if parsed.links.is_empty() {
                break;
            }
            for (title, chapter_url) in parsed.links {
                info.push_chapter(title, chapter_url);
            }
            if !parsed.has_next {
                break;
            }
            page += 1;
        }

        Ok(info)
    }

    async fn download_body_in_lightweight(
        &self,
        client: &HttpClient,
        chapter_url: &str,
    ) -> Result<String, ScrapeError> {
        let html = client.get_html(chapter_url).await?;
        parse_body(&html, chapter_url)
    }

    async fn read_info_in_browser(
        &self,
        browser: &mut BrowserSession,
        url: &str,
    ) -> Result<NovelInfo, ScrapeError> {
        let book_id =
            book_id_from(url).ok_or_else(|| ScrapeError::UnsupportedUrl(url.to_string()))?;

        let novel_url = novel_page_url(&book_id);
        let html = browser.fetch_html(&novel_url, Some(".detail")).await?;
        let mut info = parse_detail(&html, &novel_url)?;

        let mut page = 1u32;
        loop {
            let url = list_url(&book_id, page);
            let listing = browser.fetch_html(&url, Some(".read")).await?;
            let parsed = parse_chapter_page(&listing, &url, page);
            if parsed.links.is_empty() {
                break;
            }
            for (title, chapter_url) in parsed.links {
                info.push_chapter(title, chapter_url);
            }
            if !parsed.has_next {
                break;
            }
            page += 1;
        }

        Ok(info)
    }

    async fn download_body_in_browser(
        &self,
        browser: &mut BrowserSession,
        chapter_url: &str,
    ) -> Result<String, ScrapeError> {
        let html = browser.fetch_html(chapter_url, Some(".content")).await?;
        parse_body(&html, chapter_url)
    }
}

/// Pull the numeric book id out of either URL form: the novel page
/// (`shu_123.html`) or a chapter-list page (`/123/`, `/123_2/`).
fn book_id_from(url: &str) -> Option<String> {
    let novel = Regex::new(r"shu_(\d+)\.html").unwrap();
    if let Some(caps) = novel.captures(url) {
        return Some(caps[1].to_string());
    }
    let listing = Regex::new(r"/(\d+)(?:_\d+)?/").unwrap();
    listing.captures(url).map(|caps| caps[1].to_string())
}

fn novel_page_url(book_id: &str) -> String {
    format!("https://m.shuhaige.net/shu_{}.html", book_id)
}

fn list_url(book_id: &str, page: u32) -> String {
    if page == 1 {
        format!("https://m.shuhaige.net/{}/", book_id)
    } else {
        format!("https://m.shuhaige.net/{}_{}/", book_id, page)
    }
}

fn parse_detail(html: &str, page_url: &str) -> Result<NovelInfo, ScrapeError> {
    let doc = Html::parse_document(html);
    let title_sel = Selector::parse(".detail .name strong").unwrap();
    let cover_sel = Selector::parse(".detail img").unwrap();
    let author_sel = Selector::parse(".detail .author a").unwrap();
    let synopsis_sel = Selector::parse(".intro p").unwrap();

    let title = doc
        .select(&title_sel)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ScrapeError::Parse("novel title not found".to_string()))?;

    let cover_url = doc
        .select(&cover_sel)
        .next()
        .and_then(|img| img.value().attr("src"))
        .and_then(|src| absolute_url(page_url, src));

    let author = doc
        .select(&author_sel)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty());

    let synopsis = doc.select(&synopsis_sel).next().and_then(synopsis_from);

    Ok(NovelInfo {
        title,
        author,
        cover_url,
        synopsis,
        ..Default::default()
    })
}

/// The intro paragraph mixes the synopsis with author boilerplate and
/// latest-chapter links; keep only the synopsis lines.
fn synopsis_from(el: ElementRef) -> Option<String> {
    let lines: Vec<String> = el
        .text()
        .flat_map(str::lines)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !SYNOPSIS_MARKERS.iter().any(|m| line.contains(m)))
        .map(str::to_string)
        .collect();
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

struct ChapterPage {
    links: Vec<(String, String)>,
    has_next: bool,
}

fn parse_chapter_page(html: &str, page_url: &str, page: u32) -> ChapterPage {
    let doc = Html::parse_document(html);
    let link_sel = Selector::parse(".read li a").unwrap();
    let pager_sel = Selector::parse(".pagelist a").unwrap();

    let mut links = Vec::new();
    for a in doc.select(&link_sel) {
        let href = match a.value().attr("href") {
            Some(h) => h,
            None => continue,
        };
        let url = match absolute_url(page_url, href) {
            Some(u) => u,
            None => continue,
        };
        links.push((element_text(a), url));
    }

    // The pager's forward link reads 下一页; on the last page it points
    // back at the current page instead of a later one.
    let current_suffix = format!("_{}/", page);
    let has_next = doc.select(&pager_sel).any(|a| {
        element_text(a).contains("下一页")
            && a.value()
                .attr("href")
                .map(|href| !href.is_empty() && !href.ends_with(&current_suffix))
                .unwrap_or(false)
    });

    ChapterPage { links, has_next }
}

fn parse_body(html: &str, page_url: &str) -> Result<String, ScrapeError> {
    let doc = Html::parse_document(html);
    for selector in [".content", "#content", ".chapter_content"] {
        let sel = Selector::parse(selector).unwrap();
        if let Some(container) = doc.select(&sel).next() {
            return Ok(clean_contents(container, page_url, PROMO_MARKERS));
        }
    }
    Err(ScrapeError::Parse("chapter content not found".to_string()))
}
