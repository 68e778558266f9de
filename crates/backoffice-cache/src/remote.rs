//! Shared cache store backed by Redis through a deadpool connection pool.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use backoffice_core::PLACEHOLDER_TTL;
use deadpool_redis::Pool;
use redis::AsyncCommands;

use crate::error::CacheError;
use crate::store::CacheStore;

/// Stored in place of a value to mark a confirmed-absent row.
///
/// `0xC1` is the one byte MessagePack never emits, so it cannot collide with
/// an encoded entity.
pub const PLACEHOLDER_SENTINEL: &[u8] = &[0xC1];

#[derive(Clone)]
pub struct RedisCache {
    pool: Pool,
    placeholder_ttl: Duration,
}

impl RedisCache {
    pub fn new(pool: Pool) -> Self {
        Self::with_placeholder_ttl(pool, PLACEHOLDER_TTL)
    }

    pub fn with_placeholder_ttl(pool: Pool, placeholder_ttl: Duration) -> Self {
        Self {
            pool,
            placeholder_ttl,
        }
    }

    /// Check if Redis is reachable (for health checks).
    pub async fn is_available(&self) -> bool {
        self.pool.get().await.is_ok()
    }

    fn set_cmd(pipe: &mut redis::Pipeline, key: &str, value: &[u8], ttl: Duration) {
        let cmd = pipe.cmd("SET").arg(key).arg(value);
        if !ttl.is_zero() {
            cmd.arg("PX").arg(ttl.as_millis().max(1) as u64);
        }
        cmd.ignore();
    }

    async fn write(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.pool.get().await?;
        if ttl.is_zero() {
            conn.set::<_, _, ()>(key, value).await?;
        } else {
            conn.pset_ex::<_, _, ()>(key, value, ttl.as_millis().max(1) as u64)
                .await?;
        }
        tracing::debug!(key = %key, ttl_ms = ttl.as_millis() as u64, "cache set (redis)");
        Ok(())
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> Result<Arc<Vec<u8>>, CacheError> {
        let mut conn = self.pool.get().await?;
        match conn.get::<_, Option<Vec<u8>>>(key).await {
            Ok(Some(data)) if data.as_slice() == PLACEHOLDER_SENTINEL => {
                Err(CacheError::placeholder(key))
            }
            Ok(Some(data)) => Ok(Arc::new(data)),
            Ok(None) => Err(CacheError::miss(key)),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Redis GET error");
                Err(e.into())
            }
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        self.write(key, &value, ttl).await
    }

    async fn multi_get(&self, keys: &[String]) -> Result<HashMap<String, Arc<Vec<u8>>>, CacheError> {
        if keys.is_empty() {
            return Ok(HashMap::new());
        }
        let mut conn = self.pool.get().await?;
        let values: Vec<Option<Vec<u8>>> = redis::cmd("MGET")
            .arg(keys)
            .query_async(&mut conn)
            .await?;

        Ok(keys
            .iter()
            .zip(values)
            .filter_map(|(key, value)| match value {
                Some(data) if data.as_slice() != PLACEHOLDER_SENTINEL => {
                    Some((key.clone(), Arc::new(data)))
                }
                _ => None,
            })
            .collect())
    }

    async fn multi_set(&self, entries: Vec<(String, Vec<u8>)>, ttl: Duration) -> Result<(), CacheError> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut pipe = redis::pipe();
        for (key, value) in &entries {
            Self::set_cmd(&mut pipe, key, value, ttl);
        }
        let mut conn = self.pool.get().await?;
        let _: () = pipe.query_async(&mut conn).await?;
        tracing::debug!(count = entries.len(), "cache multi-set (redis)");
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.pool.get().await?;
        if let Err(e) = conn.del::<_, ()>(key).await {
            tracing::warn!(key = %key, error = %e, "Redis DEL error");
            return Err(e.into());
        }
        tracing::debug!(key = %key, "cache invalidated (redis)");
        Ok(())
    }

    async fn set_placeholder(&self, key: &str) -> Result<(), CacheError> {
        self.write(key, PLACEHOLDER_SENTINEL, self.placeholder_ttl).await
    }

    fn mode(&self) -> &'static str {
        "redis"
    }
}
