//! Repository layer for database persistence.
//!
//! All database access uses Diesel ORM with compile-time query checking,
//! driven asynchronously through diesel-async's SQLite wrapper.

pub mod artifacts;
pub mod context;
pub mod novels;
pub mod pool;
pub mod records;

#[allow(unused_imports)]
pub use artifacts::ArtifactRepository;
pub use context::DbContext;
#[allow(unused_imports)]
pub use novels::NovelRepository;
pub use pool::{AsyncSqliteConnection, AsyncSqlitePool, DieselError};
#[allow(unused_imports)]
pub use records::{ArtifactRecord, NewArtifact, NewNovel, NovelRecord};

use chrono::{DateTime, Utc};

/// Parse a datetime string from the database, defaulting to Unix epoch on
/// error.
pub fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::UNIX_EPOCH)
}
