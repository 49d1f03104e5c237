//! Database context for managing connections and repository access.
//!
//! The DbContext is the primary entry point for all database operations.
//! It holds the connection factory and provides access to all repositories.

use std::path::{Path, PathBuf};

use diesel_async::SimpleAsyncConnection;

use super::artifacts::ArtifactRepository;
use super::novels::NovelRepository;
use super::pool::{AsyncSqlitePool, DieselError};

/// Database context that owns the connection factory and hands out
/// repositories.
///
/// # Example
/// ```ignore
/// let ctx = DbContext::from_url("sqlite:novelacquire.db", output_dir);
/// ctx.init_schema().await?;
/// let novels = ctx.novels().all().await?;
/// ```
#[derive(Clone)]
pub struct DbContext {
    pool: AsyncSqlitePool,
    output_dir: PathBuf,
}

impl DbContext {
    /// Create a context from a database URL.
    pub fn from_url(database_url: &str, output_dir: PathBuf) -> Self {
        Self {
            pool: AsyncSqlitePool::new(database_url),
            output_dir,
        }
    }

    /// Create a context from a database file path.
    pub fn from_sqlite_path(db_path: &Path, output_dir: &Path) -> Self {
        Self {
            pool: AsyncSqlitePool::from_path(db_path),
            output_dir: output_dir.to_path_buf(),
        }
    }

    /// Get the underlying connection factory.
    pub fn pool(&self) -> &AsyncSqlitePool {
        &self.pool
    }

    /// Root directory novels are written under.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Get a novel repository.
    pub fn novels(&self) -> NovelRepository {
        NovelRepository::new(self.pool.clone())
    }

    /// Get an artifact repository.
    pub fn artifacts(&self) -> ArtifactRepository {
        ArtifactRepository::new(self.pool.clone())
    }

    /// Initialize the database schema, creating tables if they don't exist.
    pub async fn init_schema(&self) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;

        conn.batch_execute(
            r#"
            -- Novels table
            CREATE TABLE IF NOT EXISTS novels (
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
            );

            -- Artifacts table
            CREATE TABLE IF NOT EXISTS artifacts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                novel_id TEXT NOT NULL,
                format TEXT NOT NULL,
                output_file TEXT NOT NULL,
                file_size INTEGER NOT NULL DEFAULT 0,
                is_available INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (novel_id) REFERENCES novels(id)
            );

            -- Indexes
            CREATE INDEX IF NOT EXISTS idx_novels_url ON novels(source_url);
            CREATE INDEX IF NOT EXISTS idx_novels_updated ON novels(updated_at);
            CREATE INDEX IF NOT EXISTS idx_artifacts_novel ON artifacts(novel_id);
            "#,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_init_schema_and_repositories() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let output_dir = dir.path().join("novels");

        let ctx = DbContext::from_sqlite_path(&db_path, &output_dir);
        ctx.init_schema().await.unwrap();

        // Schema creation is idempotent.
        ctx.init_schema().await.unwrap();

        let novels = ctx.novels().all().await.unwrap();
        assert!(novels.is_empty());

        let artifacts = ctx.artifacts().for_novel("missing").await.unwrap();
        assert!(artifacts.is_empty());
    }
}
