//! PostgreSQL transaction handle.

use std::any::Any;

use async_trait::async_trait;
use backoffice_storage::{StorageError, Transaction};
use sqlx_postgres::{PgConnection, PgTransaction};

/// Wraps an sqlx transaction. Rolls back on drop unless committed.
pub struct PostgresTransaction {
    /// `None` once committed or rolled back.
    tx: Option<PgTransaction<'static>>,
}

impl PostgresTransaction {
    pub fn new(tx: PgTransaction<'static>) -> Self {
        Self { tx: Some(tx) }
    }

    pub(crate) fn connection(&mut self) -> Result<&mut PgConnection, StorageError> {
        self.tx.as_deref_mut().ok_or_else(|| {
            StorageError::transaction_error("Transaction already completed (committed or rolled back)")
        })
    }
}

#[async_trait]
impl Transaction for PostgresTransaction {
    async fn commit(mut self: Box<Self>) -> Result<(), StorageError> {
        if let Some(tx) = self.tx.take() {
            tx.commit().await.map_err(|e| {
                StorageError::transaction_error(format!("Failed to commit transaction: {e}"))
            })?;
            tracing::debug!("Transaction committed successfully");
        }
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> Result<(), StorageError> {
        if let Some(tx) = self.tx.take() {
            tx.rollback().await.map_err(|e| {
                StorageError::transaction_error(format!("Failed to rollback transaction: {e}"))
            })?;
            tracing::debug!("Transaction rolled back successfully");
        }
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Drop for PostgresTransaction {
    fn drop(&mut self) {
        if self.tx.is_some() {
            // sqlx issues the ROLLBACK when the inner transaction drops
            tracing::warn!("PostgresTransaction dropped without explicit commit/rollback - will auto-rollback");
        }
    }
}

pub(crate) fn downcast(tx: &mut dyn Transaction) -> Result<&mut PostgresTransaction, StorageError> {
    tx.as_any_mut()
        .downcast_mut::<PostgresTransaction>()
        .ok_or_else(|| StorageError::transaction_error("transaction does not belong to the PostgreSQL store"))
}
