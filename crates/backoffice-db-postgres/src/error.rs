//! Error types for the PostgreSQL storage backend.

use backoffice_storage::StorageError;
use sqlx_core::error::Error as SqlxError;

/// SQLSTATE for a unique constraint violation.
pub const PG_UNIQUE_VIOLATION: &str = "23505";

/// SQLSTATE class for data exceptions (bad casts, out of range values).
const PG_DATA_EXCEPTION_CLASS: &str = "22";

/// SQLSTATE for a NOT NULL or CHECK violation.
const PG_NOT_NULL_VIOLATION: &str = "23502";
const PG_CHECK_VIOLATION: &str = "23514";

/// Checks if a sqlx error has a specific PostgreSQL error code.
pub fn has_pg_error_code(err: &SqlxError, code: &str) -> bool {
    pg_error_code(err).as_deref() == Some(code)
}

fn pg_error_code(err: &SqlxError) -> Option<String> {
    match err {
        SqlxError::Database(db_err) => db_err.code().map(|c| c.into_owned()),
        _ => None,
    }
}

/// Errors specific to the PostgreSQL storage backend.
#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    #[error("Database connection error: {0}")]
    Connection(#[from] SqlxError),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl PostgresError {
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

impl From<PostgresError> for StorageError {
    fn from(err: PostgresError) -> Self {
        match err {
            PostgresError::Connection(e) => StorageError::connection_error(e.to_string()),
            PostgresError::Migration(e) => StorageError::internal(format!("Migration error: {e}")),
            PostgresError::Config { message } => {
                StorageError::internal(format!("Configuration error: {message}"))
            }
        }
    }
}

/// Classify a query-time sqlx error.
pub(crate) fn map_query_error(entity: &str, err: SqlxError) -> StorageError {
    if let Some(code) = pg_error_code(&err) {
        if code == PG_UNIQUE_VIOLATION {
            return StorageError::conflict(format!("{entity}: {err}"));
        }
        if code == PG_NOT_NULL_VIOLATION
            || code == PG_CHECK_VIOLATION
            || code.starts_with(PG_DATA_EXCEPTION_CLASS)
        {
            return StorageError::validation(format!("{entity}: {err}"));
        }
        return StorageError::query(format!("{entity}: {err}"));
    }
    match err {
        SqlxError::PoolTimedOut | SqlxError::PoolClosed | SqlxError::Io(_) | SqlxError::Tls(_) => {
            StorageError::connection_error(err.to_string())
        }
        SqlxError::ColumnDecode { .. } | SqlxError::Decode(_) => {
            StorageError::internal(format!("{entity}: {err}"))
        }
        other => StorageError::query(format!("{entity}: {other}")),
    }
}

/// Result type alias for PostgreSQL setup operations.
pub type Result<T> = std::result::Result<T, PostgresError>;
