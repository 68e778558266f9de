use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::CacheError;

/// Byte-level cache store with negative-cache placeholders.
///
/// A `ttl` of zero means the entry never expires. Expired entries are
/// indistinguishable from absent ones.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fails with [`CacheError::Miss`] when absent or expired and with
    /// [`CacheError::Placeholder`] when the key holds the placeholder.
    async fn get(&self, key: &str) -> Result<Arc<Vec<u8>>, CacheError>;

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;

    /// Keys without a live value (absent, expired or placeholder) are left
    /// out of the result.
    async fn multi_get(&self, keys: &[String]) -> Result<HashMap<String, Arc<Vec<u8>>>, CacheError>;

    async fn multi_set(&self, entries: Vec<(String, Vec<u8>)>, ttl: Duration) -> Result<(), CacheError>;

    /// Succeeds when the key is absent.
    async fn del(&self, key: &str) -> Result<(), CacheError>;

    /// Store the placeholder with the store's placeholder TTL.
    async fn set_placeholder(&self, key: &str) -> Result<(), CacheError>;

    /// Backend name for logs.
    fn mode(&self) -> &'static str;
}
