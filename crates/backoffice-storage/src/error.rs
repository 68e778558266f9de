//! Storage error types for the relational storage abstraction.

use std::fmt;

/// Errors that can occur during storage operations.
///
/// `Clone` so that one load outcome can be handed to several waiters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// No row matched.
    #[error("Record not found: {entity}/{id}")]
    NotFound {
        /// Entity name of the missing row.
        entity: String,
        /// Identifier or lookup value that matched nothing.
        id: String,
    },

    /// The request was rejected before reaching the backend.
    #[error("Invalid request: {message}")]
    Validation { message: String },

    /// A unique constraint was violated.
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// The backend rejected or failed the query.
    #[error("Query error: {message}")]
    Query { message: String },

    #[error("Transaction error: {message}")]
    TransactionError { message: String },

    #[error("Connection error: {message}")]
    ConnectionError { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl StorageError {
    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Creates a new `Validation` error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a new `Conflict` error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Creates a new `Query` error.
    #[must_use]
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }

    /// Creates a new `TransactionError` error.
    #[must_use]
    pub fn transaction_error(message: impl Into<String>) -> Self {
        Self::TransactionError {
            message: message.into(),
        }
    }

    /// Creates a new `ConnectionError` error.
    #[must_use]
    pub fn connection_error(message: impl Into<String>) -> Self {
        Self::ConnectionError {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if no row matched.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if this is a validation error.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::Validation { .. } => ErrorCategory::Validation,
            Self::Conflict { .. } => ErrorCategory::Conflict,
            Self::Query { .. } => ErrorCategory::Query,
            Self::TransactionError { .. } => ErrorCategory::Transaction,
            Self::ConnectionError { .. } => ErrorCategory::Infrastructure,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

/// Categories of storage errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    NotFound,
    Validation,
    Conflict,
    Query,
    Transaction,
    Infrastructure,
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::Validation => write!(f, "validation"),
            Self::Conflict => write!(f, "conflict"),
            Self::Query => write!(f, "query"),
            Self::Transaction => write!(f, "transaction"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Internal => write!(f, "internal"),
        }
    }
}
