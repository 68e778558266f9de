use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use backoffice_storage::{StorageError, Transaction};
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};

use crate::table::Tables;

/// Transaction over the in-memory tables.
///
/// Holds the write lock for its whole lifetime, so transactions are fully
/// serialized against every other access. Operations run on a staged copy
/// that replaces the live tables only on commit.
pub struct MemoryTransaction {
    guard: OwnedRwLockWriteGuard<Tables>,
    staged: Tables,
}

impl MemoryTransaction {
    pub(crate) async fn begin(tables: Arc<RwLock<Tables>>) -> Self {
        let guard = tables.write_owned().await;
        let staged = guard.clone();
        Self { guard, staged }
    }

    pub(crate) fn tables(&self) -> &Tables {
        &self.staged
    }

    pub(crate) fn tables_mut(&mut self) -> &mut Tables {
        &mut self.staged
    }
}

#[async_trait]
impl Transaction for MemoryTransaction {
    async fn commit(self: Box<Self>) -> Result<(), StorageError> {
        let MemoryTransaction { mut guard, staged } = *self;
        *guard = staged;
        tracing::debug!("memory transaction committed");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StorageError> {
        tracing::debug!("memory transaction rolled back");
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Recover the in-memory transaction from a caller-supplied handle.
pub(crate) fn downcast(tx: &mut dyn Transaction) -> Result<&mut MemoryTransaction, StorageError> {
    tx.as_any_mut()
        .downcast_mut::<MemoryTransaction>()
        .ok_or_else(|| StorageError::transaction_error("transaction does not belong to the in-memory store"))
}
