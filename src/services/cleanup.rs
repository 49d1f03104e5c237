//! Disk janitor: staged cleanup of the output directory and the catalog.

use chrono::{Duration, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::models::JobOutcome;
use crate::repository::DbContext;
use crate::storage::{folder_size, remove_folder_best_effort};

/// What one sweep removed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepStats {
    pub orphans_deleted: usize,
    pub artifacts_deleted: usize,
    pub folders_trimmed: usize,
    pub bytes_freed: u64,
}

/// Result of one sweep, for run history and CLI reporting.
#[derive(Debug, Clone, Copy)]
pub struct SweepReport {
    pub stats: SweepStats,
    pub outcome: JobOutcome,
}

enum StageEnd {
    Finished,
    Interrupted,
}

/// Runs cleanup sweeps over the output directory and the catalog database.
///
/// A sweep is a single pass of strictly ordered stages. The cancellation
/// token is honored at stage boundaries and per record in the size-based
/// stage, so a stop request never interrupts an individual delete.
pub struct CleanupService {
    db: DbContext,
    settings: Settings,
}

impl CleanupService {
    pub fn new(db: DbContext, settings: Settings) -> Self {
        Self { db, settings }
    }

    /// Run one sweep.
    ///
    /// Errors end the sweep early and are logged, never propagated; the
    /// next scheduled sweep starts over with fresh state.
    pub async fn sweep(&self, cancel: &CancellationToken) -> SweepReport {
        let mut stats = SweepStats::default();
        let outcome = match self.run_stages(cancel, &mut stats).await {
            Ok(StageEnd::Finished) => {
                info!(
                    "Cleanup sweep done: {} orphans, {} stale artifacts, {} folders trimmed ({} bytes)",
                    stats.orphans_deleted,
                    stats.artifacts_deleted,
                    stats.folders_trimmed,
                    stats.bytes_freed
                );
                JobOutcome::Completed
            }
            Ok(StageEnd::Interrupted) => {
                info!("Cleanup sweep interrupted");
                JobOutcome::Cancelled
            }
            Err(e) => {
                warn!("Cleanup sweep ended early: {:#}", e);
                JobOutcome::Failed
            }
        };
        SweepReport { stats, outcome }
    }

    async fn run_stages(
        &self,
        cancel: &CancellationToken,
        stats: &mut SweepStats,
    ) -> anyhow::Result<StageEnd> {
        let novels = self.db.novels();
        let artifacts = self.db.artifacts();

        // Stage 1: orphaned novels lose their folder and their record.
        if cancel.is_cancelled() {
            return Ok(StageEnd::Interrupted);
        }
        for novel in novels.orphans().await? {
            debug!("Removing orphaned novel {} ({})", novel.title, novel.id);
            remove_folder_best_effort(&novel.output_path);
            novels.delete(&novel.id).await?;
            stats.orphans_deleted += 1;
        }

        // Stage 2: artifact rows whose files are gone.
        if cancel.is_cancelled() {
            return Ok(StageEnd::Interrupted);
        }
        for artifact in artifacts.unavailable().await? {
            debug!(
                "Removing unavailable artifact {}",
                artifact.output_file.display()
            );
            artifacts.delete(artifact.id).await?;
            stats.artifacts_deleted += 1;
        }

        // Stage 3: size-based cleanup only runs with a configured limit.
        let limit = self.settings.disk_size_limit;
        if limit <= 0 {
            return Ok(StageEnd::Finished);
        }

        // Stage 4: nothing to trim while under the limit.
        if cancel.is_cancelled() {
            return Ok(StageEnd::Interrupted);
        }
        let mut total_size = folder_size(self.db.output_dir());
        if total_size < limit as u64 {
            debug!("Output folder at {} bytes, limit {}", total_size, limit);
            return Ok(StageEnd::Finished);
        }

        // Stage 5: drop output folders oldest-updated-first until the total
        // is under the target. Rows are kept so the catalog still lists the
        // novels; only chapters already written to disk are lost.
        let target = (limit - self.settings.disk_size_margin).max(0) as u64;
        let cutoff = Utc::now() - Duration::hours(self.settings.retention_grace_hours);
        for novel in novels.updated_before(cutoff).await? {
            if cancel.is_cancelled() {
                return Ok(StageEnd::Interrupted);
            }
            if total_size < target {
                break;
            }
            let size = folder_size(&novel.output_path);
            info!(
                "Trimming {} to reclaim {} bytes (last updated {})",
                novel.title, size, novel.updated_at
            );
            remove_folder_best_effort(&novel.output_path);
            total_size = total_size.saturating_sub(size);
            stats.folders_trimmed += 1;
            stats.bytes_freed += size;
        }

        Ok(StageEnd::Finished)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn service_with(limit: i64, dir: &std::path::Path) -> CleanupService {
        let db = DbContext::from_sqlite_path(&dir.join("test.db"), &dir.join("out"));
        db.init_schema().await.unwrap();

        let settings = Settings {
            disk_size_limit: limit,
            ..Default::default()
        };
        CleanupService::new(db, settings)
    }

    #[tokio::test]
    async fn test_cancelled_token_stops_before_first_stage() {
        let dir = tempdir().unwrap();
        let service = service_with(0, dir.path()).await;

        let mut novel = crate::models::Novel::new(
            "n1".to_string(),
            "https://example.com/1".to_string(),
            "One".to_string(),
            dir.path().join("out").join("one"),
        );
        novel.orphan = true;
        service.db.novels().save(&novel).await.unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let report = service.sweep(&cancel).await;

        assert_eq!(report.outcome, JobOutcome::Cancelled);
        assert_eq!(report.stats, SweepStats::default());
        // The orphan survives until an uninterrupted sweep.
        assert!(service.db.novels().get("n1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_no_limit_skips_size_stages() {
        let dir = tempdir().unwrap();
        let service = service_with(0, dir.path()).await;

        let out = dir.path().join("out").join("kept");
        std::fs::create_dir_all(&out).unwrap();
        std::fs::write(out.join("novel.txt"), vec![0u8; 4096]).unwrap();

        let mut novel = crate::models::Novel::new(
            "kept".to_string(),
            "https://example.com/kept".to_string(),
            "Kept".to_string(),
            out.clone(),
        );
        novel.updated_at = Utc::now() - Duration::hours(48);
        service.db.novels().save(&novel).await.unwrap();

        let report = service.sweep(&CancellationToken::new()).await;

        assert_eq!(report.outcome, JobOutcome::Completed);
        assert_eq!(report.stats.folders_trimmed, 0);
        assert!(out.exists());
    }
}
