use thiserror::Error;

/// Outcome classification for cache operations.
///
/// `Miss` and `Placeholder` are expected control-flow signals; `Backend` and
/// `Codec` are infrastructure failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("cache miss: {key}")]
    Miss { key: String },

    /// The key holds the negative-cache sentinel: the row is known to be absent.
    #[error("cache placeholder: {key}")]
    Placeholder { key: String },

    #[error("cache backend error: {message}")]
    Backend { message: String },

    #[error("cache codec error: {message}")]
    Codec { message: String },
}

impl CacheError {
    #[must_use]
    pub fn miss(key: impl Into<String>) -> Self {
        Self::Miss { key: key.into() }
    }

    #[must_use]
    pub fn placeholder(key: impl Into<String>) -> Self {
        Self::Placeholder { key: key.into() }
    }

    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec {
            message: message.into(),
        }
    }

    pub fn is_miss(&self) -> bool {
        matches!(self, Self::Miss { .. })
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder { .. })
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(e: redis::RedisError) -> Self {
        Self::backend(e.to_string())
    }
}

impl From<deadpool_redis::PoolError> for CacheError {
    fn from(e: deadpool_redis::PoolError) -> Self {
        Self::backend(format!("redis pool: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(CacheError::miss("k").is_miss());
        assert!(!CacheError::miss("k").is_placeholder());
        assert!(CacheError::placeholder("k").is_placeholder());
        assert!(!CacheError::backend("down").is_miss());
        assert!(!CacheError::backend("down").is_placeholder());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            CacheError::placeholder("config:9").to_string(),
            "cache placeholder: config:9"
        );
    }
}
