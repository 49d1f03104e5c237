//! Diesel-based novel repository for SQLite.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::parse_datetime;
use super::pool::{AsyncSqlitePool, DieselError};
use super::records::{NewNovel, NovelRecord};
use crate::models::Novel;
use crate::schema::novels;

impl From<NovelRecord> for Novel {
    fn from(record: NovelRecord) -> Self {
        Novel {
            id: record.id,
            source_url: record.source_url,
            title: record.title,
            author: record.author,
            cover_url: record.cover_url,
            synopsis: record.synopsis,
            output_path: record.output_path.into(),
            chapter_count: record.chapter_count.max(0) as u32,
            orphan: record.orphan != 0,
            created_at: parse_datetime(&record.created_at),
            updated_at: parse_datetime(&record.updated_at),
        }
    }
}

/// Repository for novel catalog rows.
#[derive(Clone)]
pub struct NovelRepository {
    pool: AsyncSqlitePool,
}

impl NovelRepository {
    pub fn new(pool: AsyncSqlitePool) -> Self {
        Self { pool }
    }

    /// Get a novel by ID.
    pub async fn get(&self, id: &str) -> Result<Option<Novel>, DieselError> {
        let mut conn = self.pool.get().await?;

        novels::table
            .find(id)
            .first::<NovelRecord>(&mut conn)
            .await
            .optional()
            .map(|opt| opt.map(Novel::from))
    }

    /// Get a novel by its source URL.
    pub async fn get_by_url(&self, source_url: &str) -> Result<Option<Novel>, DieselError> {
        let mut conn = self.pool.get().await?;

        novels::table
            .filter(novels::source_url.eq(source_url))
            .first::<NovelRecord>(&mut conn)
            .await
            .optional()
            .map(|opt| opt.map(Novel::from))
    }

    /// Get all novels.
    pub async fn all(&self) -> Result<Vec<Novel>, DieselError> {
        let mut conn = self.pool.get().await?;

        novels::table
            .load::<NovelRecord>(&mut conn)
            .await
            .map(|records| records.into_iter().map(Novel::from).collect())
    }

    /// Get novels flagged as orphaned.
    pub async fn orphans(&self) -> Result<Vec<Novel>, DieselError> {
        let mut conn = self.pool.get().await?;

        novels::table
            .filter(novels::orphan.ne(0))
            .load::<NovelRecord>(&mut conn)
            .await
            .map(|records| records.into_iter().map(Novel::from).collect())
    }

    /// Get novels last updated before the cutoff, oldest first.
    pub async fn updated_before(
        &self,
        cutoff: chrono::DateTime<chrono::Utc>,
    ) -> Result<Vec<Novel>, DieselError> {
        let mut conn = self.pool.get().await?;
        let cutoff_str = cutoff.to_rfc3339();

        novels::table
            .filter(novels::updated_at.lt(&cutoff_str))
            .order(novels::updated_at.asc())
            .load::<NovelRecord>(&mut conn)
            .await
            .map(|records| records.into_iter().map(Novel::from).collect())
    }

    /// Save a novel (insert or update).
    pub async fn save(&self, novel: &Novel) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;

        let output_path = novel.output_path.display().to_string();
        let created_at = novel.created_at.to_rfc3339();
        let updated_at = novel.updated_at.to_rfc3339();

        let record = NewNovel {
            id: &novel.id,
            source_url: &novel.source_url,
            title: &novel.title,
            author: novel.author.as_deref(),
            cover_url: novel.cover_url.as_deref(),
            synopsis: novel.synopsis.as_deref(),
            output_path: &output_path,
            chapter_count: novel.chapter_count as i32,
            orphan: novel.orphan as i32,
            created_at: &created_at,
            updated_at: &updated_at,
        };

        diesel::replace_into(novels::table)
            .values(&record)
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    /// Delete a novel record.
    pub async fn delete(&self, id: &str) -> Result<bool, DieselError> {
        let mut conn = self.pool.get().await?;

        let rows = diesel::delete(novels::table.find(id))
            .execute(&mut conn)
            .await?;

        Ok(rows > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel_async::SimpleAsyncConnection;
    use tempfile::tempdir;

    async fn setup_test_db() -> (AsyncSqlitePool, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");

        let pool = AsyncSqlitePool::from_path(&db_path);
        let mut conn = pool.get().await.unwrap();

        conn.batch_execute(
            r#"CREATE TABLE IF NOT EXISTS novels (
                id TEXT PRIMARY KEY,
                source_url TEXT NOT NULL,
                title TEXT NOT NULL,
                author TEXT,
                cover_url TEXT,
                synopsis TEXT,
                output_path TEXT NOT NULL,
                chapter_count INTEGER NOT NULL DEFAULT 0,
                orphan INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )"#,
        )
        .await
        .unwrap();

        (pool, dir)
    }

    #[tokio::test]
    async fn test_novel_crud() {
        let (pool, _dir) = setup_test_db().await;
        let repo = NovelRepository::new(pool);

        let novel = Novel::new(
            "abc123".to_string(),
            "https://example.com/novel/1".to_string(),
            "Test Novel".to_string(),
            "/tmp/novels/test-novel".into(),
        );

        repo.save(&novel).await.unwrap();

        let fetched = repo.get("abc123").await.unwrap().unwrap();
        assert_eq!(fetched.title, "Test Novel");
        assert!(!fetched.orphan);

        let by_url = repo
            .get_by_url("https://example.com/novel/1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_url.id, "abc123");

        let all = repo.all().await.unwrap();
        assert_eq!(all.len(), 1);

        let deleted = repo.delete("abc123").await.unwrap();
        assert!(deleted);
        assert!(repo.get("abc123").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_is_upsert() {
        let (pool, _dir) = setup_test_db().await;
        let repo = NovelRepository::new(pool);

        let mut novel = Novel::new(
            "abc123".to_string(),
            "https://example.com/novel/1".to_string(),
            "First Title".to_string(),
            "/tmp/novels/first".into(),
        );
        repo.save(&novel).await.unwrap();

        novel.title = "Second Title".to_string();
        novel.chapter_count = 42;
        repo.save(&novel).await.unwrap();

        let all = repo.all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "Second Title");
        assert_eq!(all[0].chapter_count, 42);
    }

    #[tokio::test]
    async fn test_orphans_filter() {
        let (pool, _dir) = setup_test_db().await;
        let repo = NovelRepository::new(pool);

        let kept = Novel::new(
            "kept".to_string(),
            "https://example.com/novel/kept".to_string(),
            "Kept".to_string(),
            "/tmp/novels/kept".into(),
        );
        let mut lost = Novel::new(
            "lost".to_string(),
            "https://example.com/novel/lost".to_string(),
            "Lost".to_string(),
            "/tmp/novels/lost".into(),
        );
        lost.orphan = true;

        repo.save(&kept).await.unwrap();
        repo.save(&lost).await.unwrap();

        let orphans = repo.orphans().await.unwrap();
        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans[0].id, "lost");
        assert!(orphans[0].orphan);
    }

    #[tokio::test]
    async fn test_updated_before_orders_oldest_first() {
        use chrono::{Duration, Utc};

        let (pool, _dir) = setup_test_db().await;
        let repo = NovelRepository::new(pool);

        let now = Utc::now();
        for (id, age_hours) in [("old", 72), ("older", 96), ("fresh", 1)] {
            let mut novel = Novel::new(
                id.to_string(),
                format!("https://example.com/novel/{id}"),
                id.to_string(),
                format!("/tmp/novels/{id}").into(),
            );
            novel.updated_at = now - Duration::hours(age_hours);
            repo.save(&novel).await.unwrap();
        }

        let stale = repo.updated_before(now - Duration::hours(24)).await.unwrap();
        let ids: Vec<&str> = stale.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["older", "old"]);
    }
}
