use std::sync::Arc;

use async_trait::async_trait;
use backoffice_core::{ColumnValue, Entity};
use backoffice_storage::{
    Filter, ListQuery, Page, RelationalStore, StorageError, Transaction, TransactionManager,
};
use tokio::sync::RwLock;

use crate::table::Tables;
use crate::transaction::{self, MemoryTransaction};

/// Process-local store backing every entity table.
///
/// Cloning is cheap and clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionManager for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>, StorageError> {
        Ok(Box::new(MemoryTransaction::begin(self.tables.clone()).await))
    }
}

#[async_trait]
impl<E: Entity> RelationalStore<E> for InMemoryStore {
    async fn insert(&self, record: &E) -> Result<E, StorageError> {
        self.tables.write().await.insert(record)
    }

    async fn insert_tx(&self, tx: &mut dyn Transaction, record: &E) -> Result<E, StorageError> {
        transaction::downcast(tx)?.tables_mut().insert(record)
    }

    async fn find_by_id(&self, id: u64) -> Result<E, StorageError> {
        self.tables
            .read()
            .await
            .get::<E>(id)?
            .ok_or_else(|| StorageError::not_found(E::NAME, id))
    }

    async fn find_by_ids(&self, ids: &[u64]) -> Result<Vec<E>, StorageError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.tables.read().await.find(&[Filter::is_in("id", ids.iter().copied())])
    }

    async fn find_one_by(&self, column: &str, value: &ColumnValue) -> Result<E, StorageError> {
        if !E::is_column(column) {
            return Err(StorageError::validation(format!(
                "unknown column '{column}' for {}",
                E::NAME
            )));
        }
        self.tables
            .read()
            .await
            .find::<E>(&[Filter::eq(column, value.clone())])?
            .into_iter()
            .next()
            .ok_or_else(|| StorageError::not_found(E::NAME, format!("{column}={}", value.to_json())))
    }

    async fn find_all_by_tx(
        &self,
        tx: &mut dyn Transaction,
        column: &str,
        value: &ColumnValue,
    ) -> Result<Vec<E>, StorageError> {
        transaction::downcast(tx)?
            .tables()
            .find(&[Filter::eq(column, value.clone())])
    }

    async fn update_by_id(
        &self,
        id: u64,
        changes: &[(&'static str, ColumnValue)],
    ) -> Result<(), StorageError> {
        self.tables.write().await.update::<E>(id, changes)
    }

    async fn update_by_id_tx(
        &self,
        tx: &mut dyn Transaction,
        id: u64,
        changes: &[(&'static str, ColumnValue)],
    ) -> Result<(), StorageError> {
        transaction::downcast(tx)?.tables_mut().update::<E>(id, changes)
    }

    async fn delete_by_ids(&self, ids: &[u64]) -> Result<u64, StorageError> {
        Ok(self.tables.write().await.delete::<E>(ids))
    }

    async fn delete_by_ids_tx(&self, tx: &mut dyn Transaction, ids: &[u64]) -> Result<u64, StorageError> {
        Ok(transaction::downcast(tx)?.tables_mut().delete::<E>(ids))
    }

    async fn list(&self, query: &ListQuery) -> Result<Page<E>, StorageError> {
        self.tables.read().await.list(query)
    }
}
