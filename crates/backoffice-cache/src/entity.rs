//! Typed entity cache over a [`CacheStore`].
//!
//! ## Cache Key Format
//!
//! - by id: `{prefix}{id}`, e.g. `config:7`
//! - by secondary key: `{prefix}key:{value}`, e.g. `config:key:imageDomain`
//!
//! Values are MessagePack-encoded with field names so that adding a column
//! never misreads an older cached entry.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use backoffice_core::Entity;

use crate::error::CacheError;
use crate::store::CacheStore;

pub struct EntityCache<E> {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for EntityCache<E> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            ttl: self.ttl,
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> EntityCache<E> {
    /// Create a cache using the entity's default TTL.
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self::with_ttl(store, E::CACHE_TTL)
    }

    pub fn with_ttl(store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            _entity: PhantomData,
        }
    }

    #[inline]
    pub fn id_key(id: u64) -> String {
        format!("{}{id}", E::CACHE_PREFIX)
    }

    #[inline]
    pub fn secondary_key(value: &str) -> String {
        format!("{}key:{value}", E::CACHE_PREFIX)
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    pub async fn get(&self, id: u64) -> Result<E, CacheError> {
        self.get_raw(&Self::id_key(id)).await
    }

    pub async fn get_by_key(&self, value: &str) -> Result<E, CacheError> {
        self.get_raw(&Self::secondary_key(value)).await
    }

    pub async fn set(&self, record: &E) -> Result<(), CacheError> {
        self.set_raw(&Self::id_key(record.id()), record).await
    }

    pub async fn set_by_key(&self, value: &str, record: &E) -> Result<(), CacheError> {
        self.set_raw(&Self::secondary_key(value), record).await
    }

    /// Ids without a cached value are absent from the result; placeholders
    /// are not reported here and need a single-key [`EntityCache::get`].
    pub async fn multi_get(&self, ids: &[u64]) -> Result<HashMap<u64, E>, CacheError> {
        let keys: Vec<String> = ids.iter().map(|id| Self::id_key(*id)).collect();
        let raw = self.store.multi_get(&keys).await?;

        let mut found = HashMap::with_capacity(raw.len());
        for (id, key) in ids.iter().zip(&keys) {
            let Some(data) = raw.get(key) else { continue };
            match rmp_serde::from_slice::<E>(data) {
                Ok(record) => {
                    found.insert(*id, record);
                }
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Failed to deserialize cached entity");
                    self.drop_undecodable(key).await;
                }
            }
        }
        Ok(found)
    }

    pub async fn multi_set(&self, records: &[E]) -> Result<(), CacheError> {
        let mut entries = Vec::with_capacity(records.len());
        for record in records {
            entries.push((Self::id_key(record.id()), encode(record)?));
        }
        self.store.multi_set(entries, self.ttl).await
    }

    pub async fn set_placeholder(&self, id: u64) -> Result<(), CacheError> {
        self.store.set_placeholder(&Self::id_key(id)).await
    }

    pub async fn set_placeholder_by_key(&self, value: &str) -> Result<(), CacheError> {
        self.store.set_placeholder(&Self::secondary_key(value)).await
    }

    pub async fn del(&self, id: u64) -> Result<(), CacheError> {
        self.store.del(&Self::id_key(id)).await
    }

    pub async fn del_by_key(&self, value: &str) -> Result<(), CacheError> {
        self.store.del(&Self::secondary_key(value)).await
    }

    async fn get_raw(&self, key: &str) -> Result<E, CacheError> {
        let data = self.store.get(key).await?;
        match rmp_serde::from_slice::<E>(&data) {
            Ok(record) => Ok(record),
            Err(e) => {
                // undecodable entries are dropped and reported as a miss so the
                // caller reloads from the store
                tracing::warn!(key = %key, error = %e, "Failed to deserialize cached entity");
                self.drop_undecodable(key).await;
                Err(CacheError::miss(key))
            }
        }
    }

    async fn drop_undecodable(&self, key: &str) {
        if let Err(e) = self.store.del(key).await {
            tracing::warn!(key = %key, error = %e, "Failed to drop undecodable cache entry");
        }
    }

    async fn set_raw(&self, key: &str, record: &E) -> Result<(), CacheError> {
        let data = encode(record)?;
        self.store.set(key, data, self.ttl).await
    }
}

fn encode<E: Entity>(record: &E) -> Result<Vec<u8>, CacheError> {
    rmp_serde::to_vec_named(record).map_err(|e| CacheError::codec(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryCache;
    use backoffice_core::{Config, Menu};

    fn cache<E: Entity>() -> (EntityCache<E>, Arc<MemoryCache>) {
        let memory = Arc::new(MemoryCache::new());
        (EntityCache::new(memory.clone()), memory)
    }

    fn config(id: u64, key: &str) -> Config {
        Config {
            id,
            key: key.into(),
            value: "v".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_key_format() {
        assert_eq!(EntityCache::<Config>::id_key(7), "config:7");
        assert_eq!(
            EntityCache::<Config>::secondary_key("imageDomain"),
            "config:key:imageDomain"
        );
        assert_eq!(EntityCache::<Menu>::id_key(1), "menu:1");
    }

    #[tokio::test]
    async fn test_round_trip() {
        let (cache, _) = cache::<Config>();
        let record = config(7, "foo");
        cache.set(&record).await.unwrap();
        assert_eq!(cache.get(7).await.unwrap(), record);
    }

    #[tokio::test]
    async fn test_menu_with_json_params() {
        let (cache, _) = cache::<Menu>();
        let menu = Menu {
            id: 3,
            name: "Users".into(),
            params: Some(serde_json::json!({"tab": "all", "n": 2})),
            ..Default::default()
        };
        cache.set(&menu).await.unwrap();
        assert_eq!(cache.get(3).await.unwrap(), menu);
    }

    #[tokio::test]
    async fn test_secondary_and_primary_are_independent() {
        let (cache, _) = cache::<Config>();
        let record = config(7, "foo");
        cache.set_by_key("foo", &record).await.unwrap();
        assert_eq!(cache.get_by_key("foo").await.unwrap(), record);
        assert!(cache.get(7).await.unwrap_err().is_miss());
    }

    #[tokio::test]
    async fn test_placeholder_by_id() {
        let (cache, _) = cache::<Config>();
        cache.set_placeholder(99).await.unwrap();
        assert!(cache.get(99).await.unwrap_err().is_placeholder());
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_dropped() {
        let (cache, memory) = cache::<Config>();
        memory
            .set("config:5", b"not msgpack".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();
        assert!(cache.get(5).await.unwrap_err().is_miss());
        assert!(memory.get("config:5").await.unwrap_err().is_miss());
    }

    #[tokio::test]
    async fn test_multi_get_returns_only_hits() {
        let (cache, _) = cache::<Config>();
        cache
            .multi_set(&[config(1, "a"), config(2, "b")])
            .await
            .unwrap();
        cache.set_placeholder(3).await.unwrap();
        let found = cache.multi_get(&[1, 2, 3, 4]).await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[&2].key, "b");
    }

    /// Memory store whose deletes always fail.
    struct StuckDeletes(MemoryCache);

    #[async_trait::async_trait]
    impl CacheStore for StuckDeletes {
        async fn get(&self, key: &str) -> Result<Arc<Vec<u8>>, CacheError> {
            self.0.get(key).await
        }
        async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
            self.0.set(key, value, ttl).await
        }
        async fn multi_get(
            &self,
            keys: &[String],
        ) -> Result<HashMap<String, Arc<Vec<u8>>>, CacheError> {
            self.0.multi_get(keys).await
        }
        async fn multi_set(
            &self,
            entries: Vec<(String, Vec<u8>)>,
            ttl: Duration,
        ) -> Result<(), CacheError> {
            self.0.multi_set(entries, ttl).await
        }
        async fn del(&self, _key: &str) -> Result<(), CacheError> {
            Err(CacheError::backend("connection reset"))
        }
        async fn set_placeholder(&self, key: &str) -> Result<(), CacheError> {
            self.0.set_placeholder(key).await
        }
        fn mode(&self) -> &'static str {
            "stuck"
        }
    }

    #[tokio::test]
    async fn test_corrupt_entry_with_failing_delete_is_still_a_miss() {
        let store = Arc::new(StuckDeletes(MemoryCache::new()));
        let cache: EntityCache<Config> = EntityCache::new(store.clone());
        store
            .set("config:5", b"not msgpack".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();

        assert!(cache.get(5).await.unwrap_err().is_miss());
        let found = cache.multi_get(&[5]).await.unwrap();
        assert!(found.is_empty());
    }
}
