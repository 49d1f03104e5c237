//! HTML parsing helpers shared by the site crawlers.
//!
//! `scraper::Html` is not `Send`, so crawlers parse inside synchronous
//! helpers that return owned values before the next await point.

use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Collect an element's text with whitespace normalized.
pub fn element_text(el: ElementRef) -> String {
    normalize(&el.text().collect::<String>())
}

/// Collect an element's text while skipping `excluded` child elements.
///
/// Madara themes decorate titles and chapter links with `<span>` badges
/// that do not belong in the visible text.
pub fn text_excluding(el: ElementRef, excluded: &str) -> String {
    let mut out = String::new();
    for child in el.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child_el) = ElementRef::wrap(child) {
            if child_el.value().name() != excluded {
                out.push_str(&child_el.text().collect::<String>());
            }
        }
    }
    normalize(&out)
}

/// Resolve a possibly relative href against the page it appeared on.
pub fn absolute_url(page_url: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty()
        || href.starts_with('#')
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("data:")
    {
        return None;
    }
    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href.to_string());
    }
    if let Some(rest) = href.strip_prefix("//") {
        return Some(format!("https://{}", rest));
    }
    Url::parse(page_url)
        .ok()?
        .join(href)
        .ok()
        .map(|u| u.to_string())
}

/// Reduce a content container to a clean HTML fragment of paragraphs and
/// images, in document order.
///
/// Paragraphs carrying one of the `skip_markers` substrings are dropped
/// (ads and site promos embedded in chapter text). Image sources are
/// resolved to absolute URLs so the fragment stays usable outside the page
/// it came from.
pub fn clean_contents(container: ElementRef, page_url: &str, skip_markers: &[&str]) -> String {
    let mut parts: Vec<String> = Vec::new();

    for node in container.descendants() {
        let el = match ElementRef::wrap(node) {
            Some(el) => el,
            None => continue,
        };
        match el.value().name() {
            "p" => {
                let text = element_text(el);
                if text.is_empty() || skip_markers.iter().any(|m| text.contains(m)) {
                    continue;
                }
                parts.push(format!("<p>{}</p>", escape(&text)));
            }
            "img" => {
                let src = match el.value().attr("data-src").or_else(|| el.value().attr("src")) {
                    Some(s) => s,
                    None => continue,
                };
                if let Some(url) = absolute_url(page_url, src) {
                    parts.push(format!(r#"<img src="{}">"#, escape(&url)));
                }
            }
            _ => {}
        }
    }

    // Some sites put chapter text directly in the container without <p> tags.
    if parts.is_empty() {
        let text = element_text(container);
        if !text.is_empty() {
            parts.push(format!("<p>{}</p>", escape(&text)));
        }
    }

    parts.join("\n")
}

/// Flatten an HTML fragment to plain text.
pub fn fragment_text(html: &str) -> String {
    let doc = Html::parse_fragment(html);
    let mut paragraphs: Vec<String> = Vec::new();
    let p = Selector::parse("p").unwrap();
    for el in doc.select(&p) {
        let text = element_text(el);
        if !text.is_empty() {
            paragraphs.push(text);
        }
    }
    if paragraphs.is_empty() {
        let text = normalize(&doc.root_element().text().collect::<String>());
        if !text.is_empty() {
            paragraphs.push(text);
        }
    }
    paragraphs.join("\n\n")
}

fn normalize(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_match<'a>(doc: &'a Html, selector: &Selector) -> ElementRef<'a> {
        doc.select(selector).next().unwrap()
    }

    #[test]
    fn test_element_text_normalizes_whitespace() {
        let doc = Html::parse_fragment("<h1>  The   Great\n  Novel </h1>");
        let sel = Selector::parse("h1").unwrap();
        assert_eq!(element_text(first_match(&doc, &sel)), "The Great Novel");
    }

    #[test]
    fn test_text_excluding_drops_span_badges() {
        let doc = Html::parse_fragment(r#"<a href="/c/5">Chapter 5 <span>Aug 21</span></a>"#);
        let sel = Selector::parse("a").unwrap();
        assert_eq!(text_excluding(first_match(&doc, &sel), "span"), "Chapter 5");
    }

    #[test]
    fn test_absolute_url_resolution() {
        let page = "https://example.com/novel/foo/";
        assert_eq!(
            absolute_url(page, "chapter-1/"),
            Some("https://example.com/novel/foo/chapter-1/".to_string())
        );
        assert_eq!(
            absolute_url(page, "/covers/a.jpg"),
            Some("https://example.com/covers/a.jpg".to_string())
        );
        assert_eq!(
            absolute_url(page, "//cdn.example.com/a.jpg"),
            Some("https://cdn.example.com/a.jpg".to_string())
        );
        assert_eq!(
            absolute_url(page, "https://other.com/x"),
            Some("https://other.com/x".to_string())
        );
        assert_eq!(absolute_url(page, "#comments"), None);
        assert_eq!(absolute_url(page, "javascript:void(0)"), None);
    }

    #[test]
    fn test_clean_contents_skips_promos_and_keeps_images() {
        let html = r#"
            <div class="content">
                <p>First paragraph.</p>
                <p>Visit our site for the fastest updates!</p>
                <img src="/art/scene.jpg">
                <p>Second paragraph.</p>
            </div>
        "#;
        let doc = Html::parse_fragment(html);
        let sel = Selector::parse(".content").unwrap();
        let body = clean_contents(
            first_match(&doc, &sel),
            "https://example.com/novel/foo/chapter-1/",
            &["fastest updates"],
        );
        assert_eq!(
            body,
            "<p>First paragraph.</p>\n\
             <img src=\"https://example.com/art/scene.jpg\">\n\
             <p>Second paragraph.</p>"
        );
    }

    #[test]
    fn test_clean_contents_falls_back_to_container_text() {
        let doc = Html::parse_fragment(r#"<div id="content">Bare text body</div>"#);
        let sel = Selector::parse("#content").unwrap();
        assert_eq!(
            clean_contents(first_match(&doc, &sel), "https://example.com/", &[]),
            "<p>Bare text body</p>"
        );
    }

    #[test]
    fn test_fragment_text_flattens_paragraphs() {
        let body = "<p>One.</p>\n<img src=\"https://x/y.jpg\">\n<p>Two.</p>";
        assert_eq!(fragment_text(body), "One.\n\nTwo.");
    }
}
