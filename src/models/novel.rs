//! Novel models: the in-memory crawl session and the catalog record.
//!
//! A `CrawlSession` is the working state for one novel's discovery and
//! download. Discovery paths never mutate it incrementally; they build a
//! complete `NovelInfo` and the session applies it wholesale, so a reader
//! never observes a mixture of two discovery passes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A volume grouping within a novel's table of contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    /// 1-based volume id in discovery order.
    pub id: u32,
    pub title: String,
}

/// An image referenced from a chapter body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterImage {
    /// Stable on-disk filename derived from the source URL.
    pub filename: String,
    /// Absolute source URL.
    pub url: String,
}

/// A single chapter in discovery order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chapter {
    /// 1-based id, dense and strictly increasing in discovery order.
    pub id: u32,
    /// Owning volume id.
    pub volume: u32,
    pub title: String,
    /// Source URL for the chapter page.
    pub url: String,
    /// Chapter text; empty until downloaded or after a failed download.
    #[serde(default)]
    pub body: String,
    /// None = not attempted, Some(true) = downloaded, Some(false) = failed.
    #[serde(default)]
    pub success: Option<bool>,
    /// Images referenced from the body.
    #[serde(default)]
    pub images: Vec<ChapterImage>,
}

impl Chapter {
    /// Whether a previous run already downloaded this chapter.
    pub fn is_downloaded(&self) -> bool {
        self.success == Some(true)
    }
}

/// Complete discovery result for one novel.
///
/// Produced in full by a lightweight or browser-backed discovery pass and
/// applied to a session atomically.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NovelInfo {
    pub title: String,
    pub author: Option<String>,
    pub cover_url: Option<String>,
    pub synopsis: Option<String>,
    pub volumes: Vec<Volume>,
    pub chapters: Vec<Chapter>,
}

impl NovelInfo {
    /// Append an explicitly titled volume, returning its id.
    pub fn push_volume(&mut self, title: impl Into<String>) -> u32 {
        let id = self.volumes.len() as u32 + 1;
        self.volumes.push(Volume {
            id,
            title: title.into(),
        });
        id
    }

    /// Append a chapter, assigning the next dense id and a volume derived
    /// from the every-100-chapters boundary. Creates "Volume N" entries as
    /// boundaries are crossed.
    pub fn push_chapter(&mut self, title: impl Into<String>, url: impl Into<String>) {
        let id = self.chapters.len() as u32 + 1;
        let volume = 1 + (id - 1) / 100;
        if volume as usize > self.volumes.len() {
            self.volumes.push(Volume {
                id: volume,
                title: format!("Volume {}", volume),
            });
        }
        self.chapters.push(Chapter {
            id,
            volume,
            title: title.into(),
            url: url.into(),
            body: String::new(),
            success: None,
            images: Vec::new(),
        });
    }

    /// Append a chapter under an explicitly assigned volume (for sites with
    /// structural volume markers).
    pub fn push_chapter_in(
        &mut self,
        volume: u32,
        title: impl Into<String>,
        url: impl Into<String>,
    ) {
        let id = self.chapters.len() as u32 + 1;
        self.chapters.push(Chapter {
            id,
            volume,
            title: title.into(),
            url: url.into(),
            body: String::new(),
            success: None,
            images: Vec::new(),
        });
    }
}

/// Working state for one novel's discovery and download process.
///
/// Serialized as `meta.json` in the novel's output folder so a later run
/// can resume, preserving already-downloaded chapters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlSession {
    /// Canonical novel page URL.
    pub novel_url: String,
    pub title: String,
    pub author: Option<String>,
    pub cover_url: Option<String>,
    pub synopsis: Option<String>,
    pub volumes: Vec<Volume>,
    pub chapters: Vec<Chapter>,
}

impl CrawlSession {
    pub fn new(novel_url: impl Into<String>) -> Self {
        Self {
            novel_url: novel_url.into(),
            title: String::new(),
            author: None,
            cover_url: None,
            synopsis: None,
            volumes: Vec::new(),
            chapters: Vec::new(),
        }
    }

    /// Replace the session's metadata and table of contents with a complete
    /// discovery result. Volumes and chapters are swapped wholesale.
    pub fn apply_info(&mut self, info: NovelInfo) {
        self.title = info.title;
        self.author = info.author;
        self.cover_url = info.cover_url;
        self.synopsis = info.synopsis;
        self.volumes = info.volumes;
        self.chapters = info.chapters;
    }

    /// Drop any partially collected table of contents before a retry via
    /// another discovery path.
    pub fn clear_toc(&mut self) {
        self.volumes.clear();
        self.chapters.clear();
    }

    /// Chapters not yet successfully downloaded.
    pub fn pending_chapters(&self) -> usize {
        self.chapters.iter().filter(|c| !c.is_downloaded()).count()
    }
}

/// One row produced by a lightweight or browser-backed search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    /// Optional display line (latest chapter, rating) when the site exposes
    /// one on the results page.
    pub info: Option<String>,
}

/// Catalog record for an archived novel.
///
/// `orphan` marks rows whose novel was removed upstream or abandoned; the
/// cleanup sweep deletes them together with their output folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Novel {
    /// Unique identifier for this novel.
    pub id: String,
    /// Canonical novel page URL.
    pub source_url: String,
    pub title: String,
    pub author: Option<String>,
    pub cover_url: Option<String>,
    pub synopsis: Option<String>,
    /// On-disk output folder holding meta.json and images.
    pub output_path: PathBuf,
    pub chapter_count: u32,
    pub orphan: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Novel {
    pub fn new(
        id: String,
        source_url: String,
        title: String,
        output_path: PathBuf,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            source_url,
            title,
            author: None,
            cover_url: None,
            synopsis: None,
            output_path,
            chapter_count: 0,
            orphan: false,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_chapter_assigns_dense_ids() {
        let mut info = NovelInfo::default();
        for n in 1..=5 {
            info.push_chapter(format!("Chapter {}", n), format!("https://x/{}", n));
        }
        let ids: Vec<u32> = info.chapters.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        assert!(info.chapters.iter().all(|c| c.volume == 1));
        assert_eq!(info.volumes.len(), 1);
    }

    #[test]
    fn test_push_chapter_volume_boundary_at_100() {
        let mut info = NovelInfo::default();
        for n in 1..=101 {
            info.push_chapter(format!("Chapter {}", n), format!("https://x/{}", n));
        }
        assert_eq!(info.chapters[99].volume, 1);
        assert_eq!(info.chapters[100].volume, 2);
        assert_eq!(info.volumes.len(), 2);
        assert_eq!(info.volumes[1].title, "Volume 2");
    }

    #[test]
    fn test_push_chapter_in_explicit_volume() {
        let mut info = NovelInfo::default();
        let v1 = info.push_volume("Arc One");
        info.push_chapter_in(v1, "Chapter 1", "https://x/1");
        let v2 = info.push_volume("Arc Two");
        info.push_chapter_in(v2, "Chapter 2", "https://x/2");
        assert_eq!(info.chapters[0].volume, v1);
        assert_eq!(info.chapters[1].volume, v2);
        assert_eq!(info.volumes[1].title, "Arc Two");
    }

    #[test]
    fn test_apply_info_replaces_toc_wholesale() {
        let mut session = CrawlSession::new("https://example.com/novel");
        let mut first = NovelInfo {
            title: "First".to_string(),
            ..Default::default()
        };
        first.push_chapter("Old 1", "https://x/old1");
        session.apply_info(first);

        let mut second = NovelInfo {
            title: "Second".to_string(),
            ..Default::default()
        };
        second.push_chapter("New 1", "https://x/new1");
        second.push_chapter("New 2", "https://x/new2");
        session.apply_info(second);

        assert_eq!(session.title, "Second");
        assert_eq!(session.chapters.len(), 2);
        assert!(session.chapters.iter().all(|c| c.url.contains("new")));
    }

    #[test]
    fn test_pending_chapters_skips_downloaded() {
        let mut session = CrawlSession::new("https://example.com/novel");
        let mut info = NovelInfo::default();
        info.push_chapter("1", "https://x/1");
        info.push_chapter("2", "https://x/2");
        session.apply_info(info);
        session.chapters[0].success = Some(true);
        assert_eq!(session.pending_chapters(), 1);
    }
}
