//! Async SQLite connection handling for Diesel.
//!
//! Uses diesel-async's SyncConnectionWrapper to provide an async interface
//! while keeping Diesel's compile-time query checking. SQLite connections are
//! lightweight, so we open a fresh connection per request rather than keeping
//! a pool of live handles.

use std::path::Path;

use diesel::sqlite::SqliteConnection;
use diesel_async::sync_connection_wrapper::SyncConnectionWrapper;
use diesel_async::AsyncConnection;

/// Diesel error type alias.
pub type DieselError = diesel::result::Error;

/// Async SQLite connection type.
pub type AsyncSqliteConnection = SyncConnectionWrapper<SqliteConnection>;

/// Carries an error message inside a `DieselError::DatabaseError`.
#[derive(Debug)]
pub struct DbErrorInfo(pub String);

impl diesel::result::DatabaseErrorInformation for DbErrorInfo {
    fn message(&self) -> &str {
        &self.0
    }
    fn details(&self) -> Option<&str> {
        None
    }
    fn hint(&self) -> Option<&str> {
        None
    }
    fn table_name(&self) -> Option<&str> {
        None
    }
    fn column_name(&self) -> Option<&str> {
        None
    }
    fn constraint_name(&self) -> Option<&str> {
        None
    }
    fn statement_position(&self) -> Option<i32> {
        None
    }
}

/// Convert any displayable error into a `DieselError`.
pub fn to_diesel_error(e: impl std::fmt::Display) -> DieselError {
    diesel::result::Error::DatabaseError(
        diesel::result::DatabaseErrorKind::Unknown,
        Box::new(DbErrorInfo(e.to_string())),
    )
}

/// SQLite connection factory (creates connections on demand).
#[derive(Clone)]
pub struct AsyncSqlitePool {
    database_url: String,
}

impl AsyncSqlitePool {
    /// Create a new pool from a database URL, stripping any `sqlite:` prefix.
    pub fn new(database_url: &str) -> Self {
        let url = database_url.strip_prefix("sqlite:").unwrap_or(database_url);
        Self {
            database_url: url.to_string(),
        }
    }

    /// Create a pool from a file path.
    pub fn from_path(path: &Path) -> Self {
        Self::new(&path.display().to_string())
    }

    /// Open a connection to the database.
    pub async fn get(&self) -> Result<AsyncSqliteConnection, DieselError> {
        AsyncSqliteConnection::establish(&self.database_url)
            .await
            .map_err(to_diesel_error)
    }
}
