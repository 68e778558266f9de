use backoffice_cache::CacheError;
use backoffice_storage::StorageError;
use thiserror::Error;

/// Errors surfaced by data access operations.
///
/// Cache misses and placeholder hits are resolved inside the DAO and never
/// appear here; a placeholder hit is reported as [`DaoError::NotFound`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DaoError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("invalid request: {message}")]
    Validation { message: String },

    /// The cache backend failed on a read; the store was not consulted.
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Store(StorageError),
}

impl DaoError {
    #[must_use]
    pub fn not_found(entity: impl Into<String>, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

impl From<StorageError> for DaoError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { entity, id } => Self::NotFound { entity, id },
            StorageError::Validation { message } => Self::Validation { message },
            other => Self::Store(other),
        }
    }
}
