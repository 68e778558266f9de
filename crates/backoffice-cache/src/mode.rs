use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CacheError;
use crate::memory::{MemoryCache, SWEEP_INTERVAL};
use crate::remote::RedisCache;
use crate::store::CacheStore;

/// Cache backend selector.
///
/// `"redis"` and `"memory"` pick a backend; any other value (including an
/// empty string) disables caching and every read goes to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
    Redis,
    Memory,
    Disabled,
}

impl CacheMode {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "redis" => Self::Redis,
            "memory" => Self::Memory,
            _ => Self::Disabled,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Redis => "redis",
            Self::Memory => "memory",
            Self::Disabled => "disabled",
        }
    }
}

impl fmt::Display for CacheMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Redis connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisSettings {
    #[serde(default = "default_redis_url")]
    pub url: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_pool_size() -> usize {
    10
}

fn default_timeout_ms() -> u64 {
    5000
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            pool_size: default_pool_size(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Build the cache store for `mode`, or `None` when caching is disabled.
///
/// The memory store gets a background sweeper for expired entries. Selecting
/// Redis when it cannot be reached is an error: a per-process cache would
/// miss invalidations made by other instances.
pub async fn create_cache_store(
    mode: CacheMode,
    redis: &RedisSettings,
    placeholder_ttl: Duration,
) -> Result<Option<Arc<dyn CacheStore>>, CacheError> {
    match mode {
        CacheMode::Disabled => {
            tracing::info!("Cache disabled, reads go straight to the store");
            Ok(None)
        }
        CacheMode::Memory => {
            tracing::info!("Using in-process memory cache");
            let cache = MemoryCache::with_placeholder_ttl(placeholder_ttl);
            cache.spawn_sweeper(SWEEP_INTERVAL);
            Ok(Some(Arc::new(cache)))
        }
        CacheMode::Redis => {
            let pool = connect_redis(redis).await?;
            Ok(Some(Arc::new(RedisCache::with_placeholder_ttl(pool, placeholder_ttl))))
        }
    }
}

async fn connect_redis(settings: &RedisSettings) -> Result<deadpool_redis::Pool, CacheError> {
    tracing::info!(url = %settings.url, "Connecting to Redis");

    let timeout = Some(Duration::from_millis(settings.timeout_ms));
    let mut pool_config = deadpool_redis::PoolConfig::new(settings.pool_size);
    pool_config.timeouts.wait = timeout;
    pool_config.timeouts.create = timeout;
    pool_config.timeouts.recycle = timeout;

    let mut redis_config = deadpool_redis::Config::from_url(&settings.url);
    redis_config.pool = Some(pool_config);

    let pool = redis_config
        .create_pool(Some(deadpool_redis::Runtime::Tokio1))
        .map_err(|e| CacheError::backend(format!("redis pool: {e}")))?;

    if let Err(e) = pool.get().await {
        tracing::error!(error = %e, url = %settings.url, "Redis is unreachable");
        return Err(e.into());
    }
    tracing::info!("Connected to Redis successfully");
    Ok(pool)
}
