//! Site-specific crawlers and the registry that picks one for a URL.

mod foxaholic;
mod phoenixnovels;
mod shuhaige;

pub use foxaholic::Foxaholic;
pub use phoenixnovels::PhoenixNovels;
pub use shuhaige::Shuhaige;

use std::sync::Arc;

use super::source::NovelSource;

/// Every registered site crawler.
pub fn all_sources() -> Vec<Arc<dyn NovelSource>> {
    vec![
        Arc::new(Foxaholic),
        Arc::new(PhoenixNovels),
        Arc::new(Shuhaige),
    ]
}

/// Find the crawler that owns a novel or search URL.
///
/// When several sites share a prefix, the longest matching base URL wins.
pub fn source_for_url(url: &str) -> Option<Arc<dyn NovelSource>> {
    let mut best: Option<(usize, Arc<dyn NovelSource>)> = None;
    for source in all_sources() {
        let matched = source
            .base_urls()
            .iter()
            .filter(|base| url.starts_with(**base))
            .map(|base| base.len())
            .max();
        if let Some(len) = matched {
            if best.as_ref().map(|(l, _)| len > *l).unwrap_or(true) {
                best = Some((len, source));
            }
        }
    }
    best.map(|(_, source)| source)
}

/// Find a crawler by its short name, case-insensitively.
pub fn source_by_name(name: &str) -> Option<Arc<dyn NovelSource>> {
    all_sources()
        .into_iter()
        .find(|s| s.name().eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_for_url_matches_base() {
        let source = source_for_url("https://m.shuhaige.net/shu_12345.html").unwrap();
        assert_eq!(source.name(), "shuhaige");

        let source = source_for_url("https://phoenixnovels.com.br/manga/some-novel/").unwrap();
        assert_eq!(source.name(), "phoenixnovels");

        assert!(source_for_url("https://unknown.example.com/novel/1").is_none());
    }

    #[test]
    fn test_source_for_url_handles_mirrors() {
        for url in [
            "https://foxaholic.com/novel/some-novel/",
            "https://www.foxaholic.com/novel/some-novel/",
            "https://18.foxaholic.com/novel/some-novel/",
        ] {
            let source = source_for_url(url).unwrap();
            assert_eq!(source.name(), "foxaholic");
        }
    }

    #[test]
    fn test_source_by_name_is_case_insensitive() {
        assert!(source_by_name("Foxaholic").is_some());
        assert!(source_by_name("SHUHAIGE").is_some());
        assert!(source_by_name("nosuchsite").is_none());
    }

    #[test]
    fn test_all_sources_have_distinct_names() {
        let sources = all_sources();
        let mut names: Vec<&str> = sources.iter().map(|s| s.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), sources.len());
    }
}
