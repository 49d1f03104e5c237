//! Artifact records: generated output files tied to a catalog novel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Output format of a generated artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    Json,
    Text,
    Epub,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Text => "text",
            Self::Epub => "epub",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "json" => Some(Self::Json),
            "text" => Some(Self::Text),
            "epub" => Some(Self::Epub),
            _ => None,
        }
    }
}

/// A generated output file for a novel.
///
/// `is_available` is cleared when the file is removed or superseded; the
/// cleanup sweep deletes unavailable rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    /// Database row ID (0 until saved).
    pub id: i64,
    pub novel_id: String,
    pub format: OutputFormat,
    /// Path of the generated file.
    pub output_file: PathBuf,
    /// Size in bytes at generation time.
    pub file_size: u64,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Artifact {
    pub fn new(
        novel_id: String,
        format: OutputFormat,
        output_file: PathBuf,
        file_size: u64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            novel_id,
            format,
            output_file,
            file_size,
            is_available: true,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_roundtrip() {
        for format in [OutputFormat::Json, OutputFormat::Text, OutputFormat::Epub] {
            assert_eq!(OutputFormat::from_str(format.as_str()), Some(format));
        }
        assert_eq!(OutputFormat::from_str("docx"), None);
    }

    #[test]
    fn test_new_artifact_is_available() {
        let artifact = Artifact::new(
            "novel-1".to_string(),
            OutputFormat::Json,
            PathBuf::from("/tmp/meta.json"),
            42,
        );
        assert!(artifact.is_available);
        assert_eq!(artifact.id, 0);
    }
}
