//! Generic cache-aside data access.
//!
//! ## Read path
//!
//! 1. No cache configured: read the store.
//! 2. Cache hit: return it without touching the store.
//! 3. Placeholder: the row is known to be absent, return `NotFound`.
//! 4. Miss: load through [`SingleFlight`] so concurrent callers share one
//!    store query. A missing row writes a placeholder, a found row is cached.
//!    Store failures other than "no row" are returned without caching.
//! 5. Any other cache failure fails fast, the store is not queried.
//!
//! Cache writes on the read path and all invalidations are best effort: a
//! failure is logged and counted, never returned.
//!
//! ## Write path
//!
//! Writes go to the store, then the affected cache entries are deleted.
//! Updates invalidate even when the store call fails. Invalidation after a
//! `_by_tx` write happens right away, not on commit.

use std::collections::{BTreeSet, HashMap};
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use backoffice_cache::metrics::{
    record_cache_hit, record_cache_miss, record_cache_write_failure, record_placeholder_hit,
    record_store_load,
};
use backoffice_cache::{CacheError, CacheStore, EntityCache, SingleFlight};
use backoffice_core::{ColumnValue, Entity};
use backoffice_storage::{
    ListQuery, Page, RelationalStore, StorageError, Transaction, TransactionManager,
};
use tracing::{debug, warn};

use crate::error::DaoError;

/// Log and count a failed best-effort cache write. Returns whether the write
/// succeeded.
pub(crate) fn best_effort<E: Entity>(
    op: &'static str,
    key: impl Display,
    result: Result<(), CacheError>,
) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            warn!(entity = E::NAME, op, key = %key, error = %e, "cache write failed, continuing");
            record_cache_write_failure(E::NAME);
            false
        }
    }
}

/// Data access for one entity type.
pub struct Dao<E: Entity> {
    pub(crate) store: Arc<dyn RelationalStore<E>>,
    transactions: Arc<dyn TransactionManager>,
    cache: Option<EntityCache<E>>,
    flight: SingleFlight<E, DaoError>,
}

impl<E: Entity> Clone for Dao<E> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            transactions: Arc::clone(&self.transactions),
            cache: self.cache.clone(),
            flight: self.flight.clone(),
        }
    }
}

impl<E: Entity> Dao<E> {
    /// `cache = None` disables caching: every read goes to the store.
    pub fn new(
        store: Arc<dyn RelationalStore<E>>,
        transactions: Arc<dyn TransactionManager>,
        cache: Option<Arc<dyn CacheStore>>,
    ) -> Self {
        Self {
            store,
            transactions,
            cache: cache.map(EntityCache::new),
            flight: SingleFlight::new(E::NAME),
        }
    }

    /// Override the entity's default cache TTL. `Duration::ZERO` never expires.
    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache = self
            .cache
            .map(|cache| EntityCache::with_ttl(Arc::clone(cache.store()), ttl));
        self
    }

    pub fn is_cached(&self) -> bool {
        self.cache.is_some()
    }

    pub async fn begin(&self) -> Result<Box<dyn Transaction>, DaoError> {
        Ok(self.transactions.begin().await?)
    }

    /// Insert a row. Nothing is cached or invalidated.
    pub async fn create(&self, record: &E) -> Result<E, DaoError> {
        Ok(self.store.insert(record).await?)
    }

    pub async fn create_by_tx(&self, tx: &mut dyn Transaction, record: &E) -> Result<E, DaoError> {
        Ok(self.store.insert_tx(tx, record).await?)
    }

    pub async fn get_by_id(&self, id: u64) -> Result<E, DaoError> {
        let Some(cache) = &self.cache else {
            return Ok(self.store.find_by_id(id).await?);
        };

        match cache.get(id).await {
            Ok(record) => {
                record_cache_hit(E::NAME);
                return Ok(record);
            }
            Err(e) if e.is_placeholder() => {
                debug!(entity = E::NAME, id, "placeholder hit");
                record_placeholder_hit(E::NAME);
                return Err(DaoError::not_found(E::NAME, id));
            }
            Err(e) if e.is_miss() => {
                debug!(entity = E::NAME, id, "cache miss");
                record_cache_miss(E::NAME);
            }
            Err(e) => return Err(DaoError::Cache(e)),
        }

        let store = Arc::clone(&self.store);
        let cache = cache.clone();
        self.flight
            .run(&id.to_string(), move || async move {
                record_store_load(E::NAME);
                match store.find_by_id(id).await {
                    Ok(record) => {
                        best_effort::<E>("set", id, cache.set(&record).await);
                        Ok(record)
                    }
                    Err(e) if e.is_not_found() => {
                        best_effort::<E>("set_placeholder", id, cache.set_placeholder(id).await);
                        Err(DaoError::not_found(E::NAME, id))
                    }
                    Err(e) => Err(e.into()),
                }
            })
            .await
    }

    /// Rows for the given ids. Ids without a row are absent from the map.
    pub async fn get_by_ids(&self, ids: &[u64]) -> Result<HashMap<u64, E>, DaoError> {
        let ids: Vec<u64> = ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let Some(cache) = &self.cache else {
            let rows = self.store.find_by_ids(&ids).await?;
            return Ok(rows.into_iter().map(|r| (r.id(), r)).collect());
        };

        let mut found = cache.multi_get(&ids).await?;
        for _ in 0..found.len() {
            record_cache_hit(E::NAME);
        }

        // a batch read cannot tell placeholders from absent keys
        let unresolved: Vec<u64> = ids.iter().copied().filter(|id| !found.contains_key(id)).collect();
        let mut missing = Vec::new();
        for id in unresolved {
            match cache.get(id).await {
                Ok(record) => {
                    record_cache_hit(E::NAME);
                    found.insert(id, record);
                }
                Err(e) if e.is_placeholder() => record_placeholder_hit(E::NAME),
                Err(e) if e.is_miss() => {
                    record_cache_miss(E::NAME);
                    missing.push(id);
                }
                Err(e) => return Err(DaoError::Cache(e)),
            }
        }
        if missing.is_empty() {
            return Ok(found);
        }

        record_store_load(E::NAME);
        let rows = self.store.find_by_ids(&missing).await?;
        if !rows.is_empty() {
            best_effort::<E>("multi_set", format!("{} rows", rows.len()), cache.multi_set(&rows).await);
        }
        for id in missing {
            if !rows.iter().any(|r| r.id() == id) {
                best_effort::<E>("set_placeholder", id, cache.set_placeholder(id).await);
            }
        }
        found.extend(rows.into_iter().map(|r| (r.id(), r)));
        Ok(found)
    }

    /// Lookup by the entity's secondary unique key, same protocol as
    /// [`Dao::get_by_id`].
    pub async fn get_by_key(&self, value: &str) -> Result<E, DaoError> {
        let Some(column) = E::SECONDARY_KEY else {
            return Err(DaoError::validation(format!("{} has no secondary key", E::NAME)));
        };
        if value.is_empty() {
            return Err(DaoError::validation(format!("{column} must not be empty")));
        }

        let Some(cache) = &self.cache else {
            return Ok(self.store.find_one_by(column, &ColumnValue::from(value)).await?);
        };

        match cache.get_by_key(value).await {
            Ok(record) => {
                record_cache_hit(E::NAME);
                return Ok(record);
            }
            Err(e) if e.is_placeholder() => {
                debug!(entity = E::NAME, key = %value, "placeholder hit");
                record_placeholder_hit(E::NAME);
                return Err(DaoError::not_found(E::NAME, value));
            }
            Err(e) if e.is_miss() => {
                debug!(entity = E::NAME, key = %value, "cache miss");
                record_cache_miss(E::NAME);
            }
            Err(e) => return Err(DaoError::Cache(e)),
        }

        let store = Arc::clone(&self.store);
        let cache = cache.clone();
        let value = value.to_string();
        self.flight
            .run(&format!("key:{value}"), move || async move {
                record_store_load(E::NAME);
                match store.find_one_by(column, &ColumnValue::from(value.as_str())).await {
                    Ok(record) => {
                        best_effort::<E>("set_by_key", &value, cache.set_by_key(&value, &record).await);
                        Ok(record)
                    }
                    Err(e) if e.is_not_found() => {
                        best_effort::<E>(
                            "set_placeholder_by_key",
                            &value,
                            cache.set_placeholder_by_key(&value).await,
                        );
                        Err(DaoError::not_found(E::NAME, &value))
                    }
                    Err(e) => Err(e.into()),
                }
            })
            .await
    }

    /// Sparse update: only the non-zero fields of `patch` are written.
    pub async fn update_by_id(&self, patch: &E) -> Result<(), DaoError> {
        let id = Self::require_id(patch)?;
        let previous_key = self.previous_key(id).await;

        let result = self.store.update_by_id(id, &patch.changes()).await;
        self.invalidate(id, [previous_key, patch.secondary_key()]).await;
        Ok(result?)
    }

    pub async fn update_by_tx(&self, tx: &mut dyn Transaction, patch: &E) -> Result<(), DaoError> {
        let id = Self::require_id(patch)?;
        let previous_key = if self.tracks_secondary_key() {
            self.find_in_tx(tx, id)
                .await
                .ok()
                .flatten()
                .and_then(|r| r.secondary_key())
        } else {
            None
        };

        let result = self.store.update_by_id_tx(tx, id, &patch.changes()).await;
        self.invalidate(id, [previous_key, patch.secondary_key()]).await;
        Ok(result?)
    }

    /// Deleting a missing row is not an error.
    pub async fn delete_by_id(&self, id: u64) -> Result<(), DaoError> {
        let key = if self.tracks_secondary_key() {
            match self.store.find_by_id(id).await {
                Ok(record) => record.secondary_key(),
                Err(e) if e.is_not_found() => None,
                Err(e) => return Err(e.into()),
            }
        } else {
            None
        };

        self.store.delete_by_ids(&[id]).await?;
        self.invalidate(id, [key]).await;
        Ok(())
    }

    /// Returns the number of deleted rows.
    pub async fn delete_by_ids(&self, ids: &[u64]) -> Result<u64, DaoError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let keys: Vec<String> = if self.tracks_secondary_key() {
            self.store
                .find_by_ids(ids)
                .await?
                .iter()
                .filter_map(|r| r.secondary_key())
                .collect()
        } else {
            Vec::new()
        };

        let deleted = self.store.delete_by_ids(ids).await?;
        self.invalidate_ids(ids).await;
        self.invalidate_keys(keys).await;
        Ok(deleted)
    }

    pub async fn delete_by_tx(&self, tx: &mut dyn Transaction, id: u64) -> Result<(), DaoError> {
        let key = if self.tracks_secondary_key() {
            self.find_in_tx(tx, id).await?.and_then(|r| r.secondary_key())
        } else {
            None
        };

        self.store.delete_by_ids_tx(tx, &[id]).await?;
        self.invalidate(id, [key]).await;
        Ok(())
    }

    /// Filtered listing, always served by the store.
    pub async fn list(&self, query: &ListQuery) -> Result<Page<E>, DaoError> {
        Ok(self.store.list(query).await?)
    }

    /// Drop the cached entries for `ids`. Deleting an absent key is fine.
    pub async fn invalidate_ids(&self, ids: &[u64]) {
        if let Some(cache) = &self.cache {
            for id in ids {
                best_effort::<E>("del", id, cache.del(*id).await);
            }
        }
    }

    async fn invalidate_keys(&self, keys: impl IntoIterator<Item = String>) {
        if let Some(cache) = &self.cache {
            let keys: BTreeSet<String> = keys.into_iter().filter(|k| !k.is_empty()).collect();
            for key in keys {
                best_effort::<E>("del_by_key", &key, cache.del_by_key(&key).await);
            }
        }
    }

    async fn invalidate<const N: usize>(&self, id: u64, keys: [Option<String>; N]) {
        self.invalidate_ids(&[id]).await;
        self.invalidate_keys(keys.into_iter().flatten()).await;
    }

    fn tracks_secondary_key(&self) -> bool {
        self.cache.is_some() && E::SECONDARY_KEY.is_some()
    }

    /// Secondary key currently stored for `id`, so an update that changes
    /// it also drops the old entry.
    async fn previous_key(&self, id: u64) -> Option<String> {
        if !self.tracks_secondary_key() {
            return None;
        }
        match self.store.find_by_id(id).await {
            Ok(record) => record.secondary_key(),
            Err(e) => {
                debug!(entity = E::NAME, id, error = %e, "previous row unavailable");
                None
            }
        }
    }

    async fn find_in_tx(&self, tx: &mut dyn Transaction, id: u64) -> Result<Option<E>, StorageError> {
        let rows = self
            .store
            .find_all_by_tx(tx, "id", &ColumnValue::from(id))
            .await?;
        Ok(rows.into_iter().next())
    }

    fn require_id(patch: &E) -> Result<u64, DaoError> {
        match patch.id() {
            0 => Err(DaoError::validation(format!("{} id cannot be 0", E::NAME))),
            id => Ok(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_best_effort_reports_outcome() {
        assert!(best_effort::<backoffice_core::Role>("set", 1, Ok(())));
        assert!(!best_effort::<backoffice_core::Role>(
            "set",
            1,
            Err(CacheError::backend("down"))
        ));
    }
}
