//! Test doubles for the DAO protocol tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use backoffice_cache::{CacheError, CacheStore, MemoryCache};
use backoffice_core::{ColumnValue, Entity};
use backoffice_dao::{Dao, Daos};
use backoffice_db_memory::InMemoryStore;
use backoffice_storage::{
    ListQuery, Page, RelationalStore, StorageError, Transaction, TransactionManager,
};

/// In-memory store that counts point reads and can be slowed down or made
/// to fail.
#[derive(Clone, Default)]
pub struct CountingStore {
    inner: InMemoryStore,
    reads: Arc<AtomicUsize>,
    delay: Option<Duration>,
    failing: Arc<AtomicBool>,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every read sleeps for `delay` before answering.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// Reads issued so far (`find_by_id`, `find_by_ids`, `find_one_by`).
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.reads.store(0, Ordering::SeqCst);
    }

    /// Make reads fail with a connection error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    async fn before_read(&self) -> Result<(), StorageError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::connection_error("injected failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl TransactionManager for CountingStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>, StorageError> {
        self.inner.begin().await
    }
}

#[async_trait]
impl<E: Entity> RelationalStore<E> for CountingStore {
    async fn insert(&self, record: &E) -> Result<E, StorageError> {
        RelationalStore::<E>::insert(&self.inner, record).await
    }

    async fn insert_tx(&self, tx: &mut dyn Transaction, record: &E) -> Result<E, StorageError> {
        RelationalStore::<E>::insert_tx(&self.inner, tx, record).await
    }

    async fn find_by_id(&self, id: u64) -> Result<E, StorageError> {
        self.before_read().await?;
        RelationalStore::<E>::find_by_id(&self.inner, id).await
    }

    async fn find_by_ids(&self, ids: &[u64]) -> Result<Vec<E>, StorageError> {
        self.before_read().await?;
        RelationalStore::<E>::find_by_ids(&self.inner, ids).await
    }

    async fn find_one_by(&self, column: &str, value: &ColumnValue) -> Result<E, StorageError> {
        self.before_read().await?;
        RelationalStore::<E>::find_one_by(&self.inner, column, value).await
    }

    async fn find_all_by_tx(
        &self,
        tx: &mut dyn Transaction,
        column: &str,
        value: &ColumnValue,
    ) -> Result<Vec<E>, StorageError> {
        RelationalStore::<E>::find_all_by_tx(&self.inner, tx, column, value).await
    }

    async fn update_by_id(
        &self,
        id: u64,
        changes: &[(&'static str, ColumnValue)],
    ) -> Result<(), StorageError> {
        RelationalStore::<E>::update_by_id(&self.inner, id, changes).await
    }

    async fn update_by_id_tx(
        &self,
        tx: &mut dyn Transaction,
        id: u64,
        changes: &[(&'static str, ColumnValue)],
    ) -> Result<(), StorageError> {
        RelationalStore::<E>::update_by_id_tx(&self.inner, tx, id, changes).await
    }

    async fn delete_by_ids(&self, ids: &[u64]) -> Result<u64, StorageError> {
        RelationalStore::<E>::delete_by_ids(&self.inner, ids).await
    }

    async fn delete_by_ids_tx(&self, tx: &mut dyn Transaction, ids: &[u64]) -> Result<u64, StorageError> {
        RelationalStore::<E>::delete_by_ids_tx(&self.inner, tx, ids).await
    }

    async fn list(&self, query: &ListQuery) -> Result<Page<E>, StorageError> {
        RelationalStore::<E>::list(&self.inner, query).await
    }
}

/// Cache store whose writes always fail. Reads either report a miss or fail
/// as well.
pub struct FailingCache {
    fail_reads: bool,
    pub write_attempts: AtomicUsize,
}

impl FailingCache {
    /// Reads miss, writes fail.
    pub fn writes() -> Self {
        Self {
            fail_reads: false,
            write_attempts: AtomicUsize::new(0),
        }
    }

    /// Every operation fails.
    pub fn everything() -> Self {
        Self {
            fail_reads: true,
            write_attempts: AtomicUsize::new(0),
        }
    }

    fn write(&self) -> Result<(), CacheError> {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);
        Err(CacheError::backend("connection refused"))
    }
}

#[async_trait]
impl CacheStore for FailingCache {
    async fn get(&self, key: &str) -> Result<Arc<Vec<u8>>, CacheError> {
        if self.fail_reads {
            Err(CacheError::backend("connection refused"))
        } else {
            Err(CacheError::miss(key))
        }
    }

    async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> Result<(), CacheError> {
        self.write()
    }

    async fn multi_get(&self, _keys: &[String]) -> Result<HashMap<String, Arc<Vec<u8>>>, CacheError> {
        if self.fail_reads {
            Err(CacheError::backend("connection refused"))
        } else {
            Ok(HashMap::new())
        }
    }

    async fn multi_set(&self, _entries: Vec<(String, Vec<u8>)>, _ttl: Duration) -> Result<(), CacheError> {
        self.write()
    }

    async fn del(&self, _key: &str) -> Result<(), CacheError> {
        self.write()
    }

    async fn set_placeholder(&self, _key: &str) -> Result<(), CacheError> {
        self.write()
    }

    fn mode(&self) -> &'static str {
        "failing"
    }
}

/// DAO over a counting store and a shared memory cache.
pub fn cached_dao<E: Entity>(store: &CountingStore) -> (Dao<E>, Arc<MemoryCache>) {
    let cache = Arc::new(MemoryCache::new());
    let shared: Arc<dyn CacheStore> = cache.clone();
    let store = Arc::new(store.clone());
    (Dao::new(store.clone(), store, Some(shared)), cache)
}

pub fn uncached_dao<E: Entity>(store: &CountingStore) -> Dao<E> {
    let store = Arc::new(store.clone());
    Dao::new(store.clone(), store, None)
}

pub fn dao_with_cache<E: Entity>(store: &CountingStore, cache: Arc<dyn CacheStore>) -> Dao<E> {
    let store = Arc::new(store.clone());
    Dao::new(store.clone(), store, Some(cache))
}

pub fn daos(store: &CountingStore, cached: bool) -> Daos {
    let cache: Option<Arc<dyn CacheStore>> = cached.then(|| Arc::new(MemoryCache::new()) as Arc<dyn CacheStore>);
    Daos::new(Arc::new(store.clone()), cache)
}
