//! Chapter image extraction and naming.

use std::collections::HashSet;

use scraper::{Html, Selector};
use sha2::{Digest, Sha256};

use super::html::absolute_url;
use crate::models::ChapterImage;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "avif"];

/// Derive a stable local filename for an image URL.
///
/// The same URL always maps to the same name, so re-runs overwrite instead
/// of accumulating duplicates.
pub fn image_filename(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    format!("{}.{}", hex::encode(&digest[..8]), extension_for(url))
}

fn extension_for(url: &str) -> &'static str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let ext = path.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
    IMAGE_EXTENSIONS
        .iter()
        .find(|e| **e == ext)
        .copied()
        .unwrap_or("jpg")
}

/// Find downloadable images referenced by a chapter body.
pub fn find_images(body: &str, page_url: &str) -> Vec<ChapterImage> {
    let doc = Html::parse_fragment(body);
    let img = Selector::parse("img").unwrap();

    let mut seen: HashSet<String> = HashSet::new();
    let mut images = Vec::new();

    for el in doc.select(&img) {
        let src = match el.value().attr("data-src").or_else(|| el.value().attr("src")) {
            Some(s) => s,
            None => continue,
        };
        let url = match absolute_url(page_url, src) {
            Some(u) => u,
            None => continue,
        };
        if !seen.insert(url.clone()) {
            continue;
        }
        images.push(ChapterImage {
            filename: image_filename(&url),
            url,
        });
    }

    images
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_filename_is_stable() {
        let a = image_filename("https://cdn.example.com/art/1.png");
        let b = image_filename("https://cdn.example.com/art/1.png");
        assert_eq!(a, b);
        assert!(a.ends_with(".png"));
        assert_eq!(a.len(), 16 + 4);
    }

    #[test]
    fn test_image_filename_defaults_to_jpg() {
        let name = image_filename("https://cdn.example.com/image?id=42");
        assert!(name.ends_with(".jpg"));
    }

    #[test]
    fn test_find_images_resolves_and_dedupes() {
        let body = r#"
            <p>Scene:</p>
            <img src="/art/a.png">
            <img src="https://example.com/art/a.png">
            <img data-src="//cdn.example.com/b.webp" src="placeholder.gif">
        "#;
        let images = find_images(body, "https://example.com/novel/c1/");

        assert_eq!(images.len(), 2);
        assert_eq!(images[0].url, "https://example.com/art/a.png");
        assert_eq!(images[1].url, "https://cdn.example.com/b.webp");
        assert!(images[1].filename.ends_with(".webp"));
    }
}
