//! Crawl-to-disk orchestration: discovery, chapter loop, images, catalog.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use chrono::Utc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Settings;
use crate::models::{Artifact, ChapterImage, CrawlSession, Novel, OutputFormat};
use crate::repository::DbContext;
use crate::scrapers::crawler::ChapterProgress;
use crate::scrapers::sources::source_for_url;
use crate::scrapers::NovelCrawler;
use crate::storage::{images_dir, meta_path, novel_dir, novel_slug};

/// Summary of one finished (or interrupted) crawl.
#[derive(Debug, Clone)]
pub struct DownloadResult {
    pub novel_id: String,
    pub title: String,
    pub output_dir: PathBuf,
    pub chapters_total: usize,
    pub chapters_downloaded: usize,
    pub chapters_failed: usize,
    pub images_saved: usize,
}

/// Downloads a novel to the output directory and records it in the catalog.
///
/// The session state is persisted as `meta.json` in the novel's folder; a
/// later crawl of the same URL restores it so finished chapters are never
/// re-fetched. Interrupted crawls still persist whatever they got.
pub struct DownloadService {
    db: DbContext,
    settings: Settings,
}

impl DownloadService {
    pub fn new(db: DbContext, settings: Settings) -> Self {
        Self { db, settings }
    }

    /// Crawl one novel URL end to end.
    pub async fn crawl(
        &self,
        novel_url: &str,
        cancel: &CancellationToken,
        progress: mpsc::UnboundedSender<ChapterProgress>,
    ) -> anyhow::Result<DownloadResult> {
        let source = source_for_url(novel_url)
            .ok_or_else(|| anyhow!("no crawler registered for {}", novel_url))?;
        info!("Crawling {} via {}", novel_url, source.name());

        let mut crawler = NovelCrawler::new(source, &self.settings, novel_url);
        crawler
            .read_info()
            .await
            .with_context(|| format!("reading novel info from {}", novel_url))?;

        let slug = novel_slug(&crawler.session.title, novel_url);
        let dir = novel_dir(self.db.output_dir(), &slug);
        restore_previous(&mut crawler.session, &dir);

        crawler.download_chapters(cancel, progress).await?;

        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("creating {}", dir.display()))?;

        let images_saved = self.save_images(&mut crawler, &dir, cancel).await;
        crawler.close_browser().await;

        let meta = meta_path(&dir);
        let json = serde_json::to_string_pretty(&crawler.session)?;
        tokio::fs::write(&meta, &json)
            .await
            .with_context(|| format!("writing {}", meta.display()))?;

        let novel = self
            .record_in_catalog(&crawler.session, novel_url, &dir, &meta, json.len() as u64)
            .await?;

        let downloaded = crawler
            .session
            .chapters
            .iter()
            .filter(|c| c.is_downloaded())
            .count();
        let failed = crawler
            .session
            .chapters
            .iter()
            .filter(|c| c.success == Some(false))
            .count();

        Ok(DownloadResult {
            novel_id: novel.id,
            title: crawler.session.title.clone(),
            output_dir: dir,
            chapters_total: crawler.session.chapters.len(),
            chapters_downloaded: downloaded,
            chapters_failed: failed,
            images_saved,
        })
    }

    /// Download the cover and every chapter image through the browser tier.
    ///
    /// One browser session serves the whole batch; the caller closes it.
    /// Failures are logged per image and skipped.
    async fn save_images(
        &self,
        crawler: &mut NovelCrawler,
        dir: &Path,
        cancel: &CancellationToken,
    ) -> usize {
        let mut saved = 0;

        if let Some(cover_url) = crawler.session.cover_url.clone() {
            match crawler.download_image(&cover_url).await {
                Ok(bytes) => {
                    let ext = infer::get(&bytes)
                        .map(|kind| kind.extension())
                        .unwrap_or("jpg");
                    let path = dir.join(format!("cover.{}", ext));
                    match tokio::fs::write(&path, &bytes).await {
                        Ok(()) => saved += 1,
                        Err(e) => warn!("Could not write cover {}: {}", path.display(), e),
                    }
                }
                Err(e) => warn!("Could not download cover {}: {}", cover_url, e),
            }
        }

        let images = pending_images(&crawler.session);
        if images.is_empty() {
            return saved;
        }

        let img_dir = images_dir(dir);
        if let Err(e) = tokio::fs::create_dir_all(&img_dir).await {
            warn!("Could not create {}: {}", img_dir.display(), e);
            return saved;
        }

        for image in images {
            if cancel.is_cancelled() {
                info!("Image download interrupted, stopping");
                break;
            }
            let path = img_dir.join(&image.filename);
            if path.exists() {
                debug!("Image {} already saved", image.filename);
                continue;
            }
            match crawler.download_image(&image.url).await {
                Ok(bytes) => match tokio::fs::write(&path, &bytes).await {
                    Ok(()) => saved += 1,
                    Err(e) => warn!("Could not write {}: {}", path.display(), e),
                },
                Err(e) => warn!("Could not download image {}: {}", image.url, e),
            }
        }

        saved
    }

    async fn record_in_catalog(
        &self,
        session: &CrawlSession,
        novel_url: &str,
        dir: &Path,
        meta: &Path,
        meta_size: u64,
    ) -> anyhow::Result<Novel> {
        let novels = self.db.novels();

        let mut novel = match novels.get_by_url(novel_url).await? {
            Some(existing) => existing,
            None => Novel::new(
                Uuid::new_v4().to_string(),
                novel_url.to_string(),
                session.title.clone(),
                dir.to_path_buf(),
            ),
        };
        novel.title = session.title.clone();
        novel.author = session.author.clone();
        novel.cover_url = session.cover_url.clone();
        novel.synopsis = session.synopsis.clone();
        novel.output_path = dir.to_path_buf();
        novel.chapter_count = session.chapters.len() as u32;
        novel.orphan = false;
        novel.updated_at = Utc::now();
        novels.save(&novel).await?;

        let artifact = Artifact::new(
            novel.id.clone(),
            OutputFormat::Json,
            meta.to_path_buf(),
            meta_size,
        );
        self.db.artifacts().save(&artifact).await?;

        Ok(novel)
    }
}

/// Restore finished chapters from a previous run's `meta.json`, matched by
/// chapter URL so reordered or extended chapter lists stay consistent.
fn restore_previous(session: &mut CrawlSession, dir: &Path) {
    let path = meta_path(dir);
    let data = match std::fs::read_to_string(&path) {
        Ok(data) => data,
        Err(_) => return,
    };
    let previous: CrawlSession = match serde_json::from_str(&data) {
        Ok(session) => session,
        Err(e) => {
            warn!("Ignoring unreadable session file {}: {}", path.display(), e);
            return;
        }
    };

    let finished: HashMap<&str, &crate::models::Chapter> = previous
        .chapters
        .iter()
        .filter(|c| c.is_downloaded())
        .map(|c| (c.url.as_str(), c))
        .collect();
    if finished.is_empty() {
        return;
    }

    let mut restored = 0;
    for chapter in &mut session.chapters {
        if let Some(old) = finished.get(chapter.url.as_str()) {
            chapter.body = old.body.clone();
            chapter.images = old.images.clone();
            chapter.success = Some(true);
            restored += 1;
        }
    }
    if restored > 0 {
        info!("Resuming: {} chapters already downloaded", restored);
    }
}

/// Images referenced by downloaded chapters, deduplicated by filename.
fn pending_images(session: &CrawlSession) -> Vec<ChapterImage> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut images = Vec::new();
    for chapter in session.chapters.iter().filter(|c| c.is_downloaded()) {
        for image in &chapter.images {
            if seen.insert(image.filename.clone()) {
                images.push(image.clone());
            }
        }
    }
    images
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Chapter;
    use tempfile::tempdir;

    fn chapter(id: u32, url: &str, body: &str, success: Option<bool>) -> Chapter {
        Chapter {
            id,
            volume: 1,
            title: format!("Chapter {}", id),
            url: url.to_string(),
            body: body.to_string(),
            success,
            images: Vec::new(),
        }
    }

    #[test]
    fn test_restore_previous_matches_by_url() {
        let dir = tempdir().unwrap();

        let mut old = CrawlSession::new("https://example.com/novel/1");
        old.title = "Old".to_string();
        old.chapters
            .push(chapter(1, "https://example.com/c/1", "Body one", Some(true)));
        old.chapters
            .push(chapter(2, "https://example.com/c/2", "", Some(false)));
        std::fs::write(
            meta_path(dir.path()),
            serde_json::to_string_pretty(&old).unwrap(),
        )
        .unwrap();

        // The new discovery found an extra chapter at the front.
        let mut fresh = CrawlSession::new("https://example.com/novel/1");
        fresh
            .chapters
            .push(chapter(1, "https://example.com/c/0", "", None));
        fresh
            .chapters
            .push(chapter(2, "https://example.com/c/1", "", None));
        fresh
            .chapters
            .push(chapter(3, "https://example.com/c/2", "", None));

        restore_previous(&mut fresh, dir.path());

        assert_eq!(fresh.chapters[0].success, None);
        assert_eq!(fresh.chapters[1].body, "Body one");
        assert_eq!(fresh.chapters[1].success, Some(true));
        // Failed chapters are retried, not restored.
        assert_eq!(fresh.chapters[2].success, None);
    }

    #[test]
    fn test_restore_previous_without_file_is_noop() {
        let dir = tempdir().unwrap();
        let mut fresh = CrawlSession::new("https://example.com/novel/1");
        fresh
            .chapters
            .push(chapter(1, "https://example.com/c/1", "", None));

        restore_previous(&mut fresh, dir.path());
        assert_eq!(fresh.chapters[0].success, None);
    }

    #[test]
    fn test_pending_images_dedupes_across_chapters() {
        let mut session = CrawlSession::new("https://example.com/novel/1");
        let mut one = chapter(1, "https://example.com/c/1", "x", Some(true));
        one.images.push(ChapterImage {
            filename: "aa.jpg".to_string(),
            url: "https://cdn.example.com/a.jpg".to_string(),
        });
        let mut two = chapter(2, "https://example.com/c/2", "y", Some(true));
        two.images.push(ChapterImage {
            filename: "aa.jpg".to_string(),
            url: "https://cdn.example.com/a.jpg".to_string(),
        });
        two.images.push(ChapterImage {
            filename: "bb.png".to_string(),
            url: "https://cdn.example.com/b.png".to_string(),
        });
        let mut three = chapter(3, "https://example.com/c/3", "", Some(false));
        three.images.push(ChapterImage {
            filename: "cc.png".to_string(),
            url: "https://cdn.example.com/c.png".to_string(),
        });
        session.chapters.extend([one, two, three]);

        let images = pending_images(&session);
        let names: Vec<&str> = images.iter().map(|i| i.filename.as_str()).collect();
        // Only downloaded chapters contribute, each file once.
        assert_eq!(names, vec!["aa.jpg", "bb.png"]);
    }

    #[tokio::test]
    async fn test_record_in_catalog_upserts_row_and_artifact() {
        let dir = tempdir().unwrap();
        let db = DbContext::from_sqlite_path(&dir.path().join("test.db"), dir.path());
        db.init_schema().await.unwrap();
        let service = DownloadService::new(db.clone(), Settings::default());

        let mut session = CrawlSession::new("https://example.com/novel/1");
        session.title = "First Pass".to_string();
        session
            .chapters
            .push(chapter(1, "https://example.com/c/1", "Body", Some(true)));

        let out = dir.path().join("first-pass");
        let meta = out.join("meta.json");
        let novel = service
            .record_in_catalog(&session, "https://example.com/novel/1", &out, &meta, 512)
            .await
            .unwrap();
        assert_eq!(novel.title, "First Pass");
        assert_eq!(novel.chapter_count, 1);

        // A second crawl of the same URL reuses the row.
        session.title = "Second Pass".to_string();
        session
            .chapters
            .push(chapter(2, "https://example.com/c/2", "More", Some(true)));
        let again = service
            .record_in_catalog(&session, "https://example.com/novel/1", &out, &meta, 1024)
            .await
            .unwrap();
        assert_eq!(again.id, novel.id);
        assert_eq!(again.chapter_count, 2);

        let all = db.novels().all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "Second Pass");

        let artifacts = db.artifacts().for_novel(&novel.id).await.unwrap();
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].file_size, 1024);
    }
}
