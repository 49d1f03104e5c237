//! Crawler for phoenixnovels.com.br, a WordPress manga skin.
//!
//! Everything works over plain HTTP. The chapter list is not part of the
//! novel page; it comes from an AJAX POST endpoint. Volumes are taken from
//! the structural list markers when the site groups chapters, otherwise
//! chapters arrive as one flat list.

use async_trait::async_trait;
use scraper::{Html, Selector};

use crate::models::{NovelInfo, SearchResult};
use crate::scrapers::browser::BrowserSession;
use crate::scrapers::html::{absolute_url, clean_contents, element_text, text_excluding};
use crate::scrapers::http_client::HttpClient;
use crate::scrapers::source::NovelSource;
use crate::scrapers::ScrapeError;

pub struct PhoenixNovels;

#[async_trait]
impl NovelSource for PhoenixNovels {
    fn name(&self) -> &str {
        "phoenixnovels"
    }

    fn base_urls(&self) -> &[&str] {
        &["https://phoenixnovels.com.br/"]
    }

    async fn search_in_lightweight(
        &self,
        client: &HttpClient,
        query: &str,
    ) -> Result<Vec<SearchResult>, ScrapeError> {
        let query = query.to_lowercase();
        let url = format!(
            "https://phoenixnovels.com.br/?s={}&post_type=wp-manga",
            urlencoding::encode(&query)
        );
        let html = client.get_html(&url).await?;
        Ok(parse_search(&html, &url))
    }

    async fn read_info_in_lightweight(
        &self,
        client: &HttpClient,
        url: &str,
    ) -> Result<NovelInfo, ScrapeError> {
        let html = client.get_html(url).await?;
        let mut info = parse_profile(&html, url)?;

        let listing = client.post_html(&chapter_list_url(url)).await?;
        let doc = Html::parse_fragment(&listing);
        collect_chapters(&doc, url, &mut info)?;
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
        // The rendered page has already run the chapter-list AJAX itself.
        let html = browser.fetch_html(url, Some("li.wp-manga-chapter")).await?;
        let mut info = parse_profile(&html, url)?;
        let doc = Html::parse_document(&html);
        collect_chapters(&doc, url, &mut info)?;
        Ok(info)
    }

    async fn download_body_in_browser(
        &self,
        browser: &mut BrowserSession,
        chapter_url: &str,
    ) -> Result<String, ScrapeError> {
        let html = browser
            .fetch_html(chapter_url, Some(".reading-content"))
            .await?;
        parse_body(&html, chapter_url)
    }
}

fn chapter_list_url(novel_url: &str) -> String {
    if novel_url.ends_with('/') {
        format!("{}ajax/chapters", novel_url)
    } else {
        format!("{}/ajax/chapters", novel_url)
    }
}

fn parse_profile(html: &str, page_url: &str) -> Result<NovelInfo, ScrapeError> {
    let doc = Html::parse_document(html);
    let title_sel = Selector::parse("#manga-title h1").unwrap();
    let cover_sel = Selector::parse(".summary_image img").unwrap();
    let author_sel = Selector::parse(r#".author-content a[href*="novel-author"]"#).unwrap();

    // The title element carries badge spans that are not part of the name.
    let title = doc
        .select(&title_sel)
        .next()
        .map(|el| text_excluding(el, "span"))
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

    Ok(NovelInfo {
        title,
        author: (!authors.is_empty()).then(|| authors.join(" ")),
        cover_url,
        ..Default::default()
    })
}

fn collect_chapters(doc: &Html, page_url: &str, info: &mut NovelInfo) -> Result<(), ScrapeError> {
    let volume_sel = Selector::parse("li.parent.has-child").unwrap();
    let volume_title_sel = Selector::parse("a.has-child").unwrap();
    let chapter_sel = Selector::parse(".wp-manga-chapter a[href]").unwrap();

    let volume_items: Vec<_> = doc.select(&volume_sel).collect();
    if volume_items.is_empty() {
        // Flat list, newest first.
        let links: Vec<_> = doc.select(&chapter_sel).collect();
        for a in links.into_iter().rev() {
            if let Some((title, url)) = chapter_link(a, page_url) {
                info.push_chapter(title, url);
            }
        }
    } else {
        // Volume groups are listed newest first, as are the chapters
        // inside each group.
        for item in volume_items.into_iter().rev() {
            let volume_title = match item.select(&volume_title_sel).next() {
                Some(el) => text_excluding(el, "span"),
                None => continue,
            };
            let volume = info.push_volume(volume_title);
            let links: Vec<_> = item.select(&chapter_sel).collect();
            for a in links.into_iter().rev() {
                if let Some((title, url)) = chapter_link(a, page_url) {
                    info.push_chapter_in(volume, title, url);
                }
            }
        }
    }

    if info.chapters.is_empty() {
        return Err(ScrapeError::Parse("chapter list empty".to_string()));
    }
    Ok(())
}

fn chapter_link(a: scraper::ElementRef, page_url: &str) -> Option<(String, String)> {
    let href = a.value().attr("href")?;
    let url = absolute_url(page_url, href)?;
    Some((text_excluding(a, "span"), url))
}

fn parse_body(html: &str, page_url: &str) -> Result<String, ScrapeError> {
    let doc = Html::parse_document(html);
    let primary = Selector::parse(".reading-content").unwrap();
    let fallback = Selector::parse(".text-left").unwrap();

    let container = doc
        .select(&primary)
        .next()
        .or_else(|| doc.select(&fallback).next())
        .ok_or_else(|| ScrapeError::Parse("chapter content not found".to_string()))?;
    Ok(clean_contents(container, page_url, &[]))
}

fn parse_search(html: &str, page_url: &str) -> Vec<SearchResult> {
    let doc = Html::parse_document(html);
    let tab_sel = Selector::parse(".c-tabs-item__content").unwrap();
    let link_sel = Selector::parse(".post-title h3 a").unwrap();
    let latest_sel = Selector::parse(".latest-chap .chapter a").unwrap();
    let votes_sel = Selector::parse(".rating .total_votes").unwrap();

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
            .unwrap_or_else(|| "N/A".to_string());
        let votes = tab
            .select(&votes_sel)
            .next()
            .map(element_text)
            .unwrap_or_else(|| "0".to_string());
        results.push(SearchResult {
            title: element_text(a),
            url,
            info: Some(format!("{} | Rating: {}", latest, votes)),
        });
    }
    results
}
