//! Diesel-based artifact repository for SQLite.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::parse_datetime;
use super::pool::{AsyncSqlitePool, DieselError};
use super::records::{ArtifactRecord, NewArtifact};
use crate::models::{Artifact, OutputFormat};
use crate::schema::artifacts;

impl From<ArtifactRecord> for Artifact {
    fn from(record: ArtifactRecord) -> Self {
        Artifact {
            id: record.id as i64,
            novel_id: record.novel_id,
            format: OutputFormat::from_str(&record.format).unwrap_or(OutputFormat::Json),
            output_file: record.output_file.into(),
            file_size: record.file_size.max(0) as u64,
            is_available: record.is_available != 0,
            created_at: parse_datetime(&record.created_at),
            updated_at: parse_datetime(&record.updated_at),
        }
    }
}

/// Repository for generated output files.
#[derive(Clone)]
pub struct ArtifactRepository {
    pool: AsyncSqlitePool,
}

impl ArtifactRepository {
    pub fn new(pool: AsyncSqlitePool) -> Self {
        Self { pool }
    }

    /// Get all artifacts belonging to a novel.
    pub async fn for_novel(&self, novel_id: &str) -> Result<Vec<Artifact>, DieselError> {
        let mut conn = self.pool.get().await?;

        artifacts::table
            .filter(artifacts::novel_id.eq(novel_id))
            .load::<ArtifactRecord>(&mut conn)
            .await
            .map(|records| records.into_iter().map(Artifact::from).collect())
    }

    /// Save an artifact, replacing any existing row for the same novel and
    /// format.
    pub async fn save(&self, artifact: &Artifact) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;

        let existing: Option<ArtifactRecord> = artifacts::table
            .filter(artifacts::novel_id.eq(&artifact.novel_id))
            .filter(artifacts::format.eq(artifact.format.as_str()))
            .first::<ArtifactRecord>(&mut conn)
            .await
            .optional()?;

        let output_file = artifact.output_file.display().to_string();
        let updated_at = artifact.updated_at.to_rfc3339();

        match existing {
            Some(record) => {
                diesel::update(artifacts::table.find(record.id))
                    .set((
                        artifacts::output_file.eq(&output_file),
                        artifacts::file_size.eq(artifact.file_size as i32),
                        artifacts::is_available.eq(artifact.is_available as i32),
                        artifacts::updated_at.eq(&updated_at),
                    ))
                    .execute(&mut conn)
                    .await?;
            }
            None => {
                let created_at = artifact.created_at.to_rfc3339();
                let record = NewArtifact {
                    novel_id: &artifact.novel_id,
                    format: artifact.format.as_str(),
                    output_file: &output_file,
                    file_size: artifact.file_size as i32,
                    is_available: artifact.is_available as i32,
                    created_at: &created_at,
                    updated_at: &updated_at,
                };
                diesel::insert_into(artifacts::table)
                    .values(&record)
                    .execute(&mut conn)
                    .await?;
            }
        }

        Ok(())
    }

    /// Get artifacts whose files are no longer available on disk.
    pub async fn unavailable(&self) -> Result<Vec<Artifact>, DieselError> {
        let mut conn = self.pool.get().await?;

        artifacts::table
            .filter(artifacts::is_available.eq(0))
            .load::<ArtifactRecord>(&mut conn)
            .await
            .map(|records| records.into_iter().map(Artifact::from).collect())
    }

    /// Delete an artifact row.
    pub async fn delete(&self, id: i64) -> Result<bool, DieselError> {
        let mut conn = self.pool.get().await?;

        let rows = diesel::delete(artifacts::table.find(id as i32))
            .execute(&mut conn)
            .await?;

        Ok(rows > 0)
    }
}
