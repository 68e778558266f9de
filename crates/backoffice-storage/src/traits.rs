use std::any::Any;

use async_trait::async_trait;
use backoffice_core::{ColumnValue, Entity};

use crate::error::StorageError;
use crate::query::{ListQuery, Page};

/// A caller-managed transaction.
///
/// Backends hand out their own transaction type behind this trait and
/// recover it with [`Transaction::as_any_mut`] inside their `_tx` operations.
/// Dropping a transaction without committing rolls it back.
#[async_trait]
pub trait Transaction: Send {
    /// Commits all operations in this transaction.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::TransactionError` if the commit fails.
    async fn commit(self: Box<Self>) -> Result<(), StorageError>;

    /// Rolls back all operations in this transaction.
    async fn rollback(self: Box<Self>) -> Result<(), StorageError>;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

#[async_trait]
pub trait TransactionManager: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn Transaction>, StorageError>;
}

/// Row-level access to one entity table.
///
/// Every lookup that matches nothing fails with [`StorageError::NotFound`];
/// any other error is an infrastructure or query failure.
#[async_trait]
pub trait RelationalStore<E: Entity>: Send + Sync {
    /// Insert a row. The store assigns `id` and the timestamps and returns
    /// the stored record.
    async fn insert(&self, record: &E) -> Result<E, StorageError>;

    async fn insert_tx(&self, tx: &mut dyn Transaction, record: &E) -> Result<E, StorageError>;

    async fn find_by_id(&self, id: u64) -> Result<E, StorageError>;

    /// Rows for the ids that exist; missing ids are skipped.
    async fn find_by_ids(&self, ids: &[u64]) -> Result<Vec<E>, StorageError>;

    /// First row whose `column` equals `value`.
    async fn find_one_by(&self, column: &str, value: &ColumnValue) -> Result<E, StorageError>;

    /// Rows whose `column` equals `value`, read inside `tx`.
    async fn find_all_by_tx(
        &self,
        tx: &mut dyn Transaction,
        column: &str,
        value: &ColumnValue,
    ) -> Result<Vec<E>, StorageError>;

    /// Overwrite only the given columns and refresh `updated_at`.
    async fn update_by_id(
        &self,
        id: u64,
        changes: &[(&'static str, ColumnValue)],
    ) -> Result<(), StorageError>;

    async fn update_by_id_tx(
        &self,
        tx: &mut dyn Transaction,
        id: u64,
        changes: &[(&'static str, ColumnValue)],
    ) -> Result<(), StorageError>;

    /// Returns the number of deleted rows. Missing ids are not an error.
    async fn delete_by_ids(&self, ids: &[u64]) -> Result<u64, StorageError>;

    async fn delete_by_ids_tx(&self, tx: &mut dyn Transaction, ids: &[u64]) -> Result<u64, StorageError>;

    async fn list(&self, query: &ListQuery) -> Result<Page<E>, StorageError>;
}
