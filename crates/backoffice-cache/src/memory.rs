//! In-process cache store backed by DashMap.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use backoffice_core::PLACEHOLDER_TTL;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::error::CacheError;
use crate::store::CacheStore;

#[derive(Clone, Debug)]
enum Slot {
    Value(Arc<Vec<u8>>),
    Placeholder,
}

/// A cached slot with TTL support. `ttl: None` never expires.
#[derive(Clone, Debug)]
struct CachedEntry {
    slot: Slot,
    cached_at: Instant,
    ttl: Option<Duration>,
}

impl CachedEntry {
    fn new(slot: Slot, ttl: Duration) -> Self {
        Self {
            slot,
            cached_at: Instant::now(),
            ttl: (!ttl.is_zero()).then_some(ttl),
        }
    }

    fn is_expired(&self) -> bool {
        self.ttl.is_some_and(|ttl| self.cached_at.elapsed() > ttl)
    }
}

/// How often [`MemoryCache::spawn_sweeper`] drops expired entries by default.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// Single-instance cache. DashMap shards serialize concurrent access.
///
/// Expired entries are dropped lazily on read and in bulk by the sweeper
/// task; without a sweeper, placeholders for ids that are never read again
/// stay in the map.
#[derive(Clone)]
pub struct MemoryCache {
    entries: Arc<DashMap<String, CachedEntry>>,
    placeholder_ttl: Duration,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::with_placeholder_ttl(PLACEHOLDER_TTL)
    }

    pub fn with_placeholder_ttl(placeholder_ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            placeholder_ttl,
        }
    }

    /// Live (non-expired) entry count, placeholders included.
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_expired()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop expired entries, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        purge(&self.entries)
    }

    /// Spawn a task that purges expired entries every `every`.
    ///
    /// The task holds a weak reference and exits once the last clone of the
    /// cache is dropped.
    pub fn spawn_sweeper(&self, every: Duration) -> JoinHandle<()> {
        let entries = Arc::downgrade(&self.entries);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(entries) = entries.upgrade() else {
                    break;
                };
                let removed = purge(&entries);
                if removed > 0 {
                    tracing::debug!(removed, remaining = entries.len(), "swept expired cache entries");
                }
            }
        })
    }

    fn live_slot(&self, key: &str) -> Option<Slot> {
        let entry = self.entries.get(key)?;
        if entry.is_expired() {
            drop(entry);
            self.entries.remove_if(key, |_, e| e.is_expired());
            return None;
        }
        Some(entry.slot.clone())
    }
}

fn purge(entries: &DashMap<String, CachedEntry>) -> usize {
    let before = entries.len();
    entries.retain(|_, entry| !entry.is_expired());
    before.saturating_sub(entries.len())
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Arc<Vec<u8>>, CacheError> {
        match self.live_slot(key) {
            Some(Slot::Value(data)) => Ok(data),
            Some(Slot::Placeholder) => Err(CacheError::placeholder(key)),
            None => Err(CacheError::miss(key)),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        self.entries.insert(
            key.to_string(),
            CachedEntry::new(Slot::Value(Arc::new(value)), ttl),
        );
        Ok(())
    }

    async fn multi_get(&self, keys: &[String]) -> Result<HashMap<String, Arc<Vec<u8>>>, CacheError> {
        let mut found = HashMap::with_capacity(keys.len());
        for key in keys {
            if let Some(Slot::Value(data)) = self.live_slot(key) {
                found.insert(key.clone(), data);
            }
        }
        Ok(found)
    }

    async fn multi_set(&self, entries: Vec<(String, Vec<u8>)>, ttl: Duration) -> Result<(), CacheError> {
        for (key, value) in entries {
            self.entries
                .insert(key, CachedEntry::new(Slot::Value(Arc::new(value)), ttl));
        }
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), CacheError> {
        self.entries.remove(key);
        tracing::debug!(key = %key, "cache invalidated (memory)");
        Ok(())
    }

    async fn set_placeholder(&self, key: &str) -> Result<(), CacheError> {
        self.entries.insert(
            key.to_string(),
            CachedEntry::new(Slot::Placeholder, self.placeholder_ttl),
        );
        Ok(())
    }

    fn mode(&self) -> &'static str {
        "memory"
    }
}
