use async_trait::async_trait;
use backoffice_core::{ColumnValue, Entity};
use backoffice_storage::{
    ListQuery, Page, RelationalStore, StorageError, Transaction, TransactionManager,
};
use serde_json::Value;
use sqlx_core::executor::Executor;
use sqlx_core::query::query;
use sqlx_core::row::Row;
use sqlx_postgres::{PgPool, Postgres};
use tracing::{debug, info};

use crate::error::{PostgresError, map_query_error};
use crate::migrations;
use crate::pool::{self, PgPoolOptions};
use crate::sql::{self, SqlBuilder, bind_args};
use crate::transaction::{self, PostgresTransaction};

/// PostgreSQL-backed relational store serving every entity table.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool against `url` and verify connectivity.
    pub async fn connect(url: &str, options: PgPoolOptions) -> Result<Self, PostgresError> {
        let pool = pool::create_pool(url, options).await?;
        info!("PostgreSQL store ready");
        Ok(Self::new(pool))
    }

    /// Apply pending schema migrations.
    pub async fn migrate(&self) -> Result<(), PostgresError> {
        migrations::run(&self.pool).await
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

async fn fetch_rows<'c, X>(exec: X, entity: &str, stmt: &SqlBuilder) -> Result<Vec<Value>, StorageError>
where
    X: Executor<'c, Database = Postgres>,
{
    debug!(entity, sql = %stmt.sql, "fetch");
    let rows = bind_args(query(&stmt.sql), &stmt.args)
        .fetch_all(exec)
        .await
        .map_err(|e| map_query_error(entity, e))?;
    rows.iter()
        .map(|row| row.try_get::<Value, _>(0).map_err(|e| map_query_error(entity, e)))
        .collect()
}

async fn execute<'c, X>(exec: X, entity: &str, stmt: &SqlBuilder) -> Result<u64, StorageError>
where
    X: Executor<'c, Database = Postgres>,
{
    debug!(entity, sql = %stmt.sql, "execute");
    let result = bind_args(query(&stmt.sql), &stmt.args)
        .execute(exec)
        .await
        .map_err(|e| map_query_error(entity, e))?;
    Ok(result.rows_affected())
}

async fn count<'c, X>(exec: X, entity: &str, stmt: &SqlBuilder) -> Result<u64, StorageError>
where
    X: Executor<'c, Database = Postgres>,
{
    let row = bind_args(query(&stmt.sql), &stmt.args)
        .fetch_one(exec)
        .await
        .map_err(|e| map_query_error(entity, e))?;
    let total: i64 = row.try_get(0).map_err(|e| map_query_error(entity, e))?;
    Ok(u64::try_from(total).unwrap_or_default())
}

fn decode<E: Entity>(row: Value) -> Result<E, StorageError> {
    serde_json::from_value(row).map_err(|e| StorageError::internal(format!("decode {}: {e}", E::NAME)))
}

fn decode_all<E: Entity>(rows: Vec<Value>) -> Result<Vec<E>, StorageError> {
    rows.into_iter().map(decode::<E>).collect()
}

fn decode_inserted<E: Entity>(rows: Vec<Value>) -> Result<E, StorageError> {
    let row = rows
        .into_iter()
        .next()
        .ok_or_else(|| StorageError::internal(format!("insert into {} returned no row", E::TABLE)))?;
    decode(row)
}

fn require_updated<E: Entity>(id: u64, affected: u64) -> Result<(), StorageError> {
    if affected == 0 {
        Err(StorageError::not_found(E::NAME, id))
    } else {
        Ok(())
    }
}

#[async_trait]
impl TransactionManager for PostgresStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>, StorageError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::transaction_error(format!("Failed to begin transaction: {e}")))?;
        Ok(Box::new(PostgresTransaction::new(tx)))
    }
}

#[async_trait]
impl<E: Entity> RelationalStore<E> for PostgresStore {
    async fn insert(&self, record: &E) -> Result<E, StorageError> {
        let rows = fetch_rows(&self.pool, E::NAME, &sql::insert(record)).await?;
        decode_inserted(rows)
    }

    async fn insert_tx(&self, tx: &mut dyn Transaction, record: &E) -> Result<E, StorageError> {
        let conn = transaction::downcast(tx)?.connection()?;
        let rows = fetch_rows(conn, E::NAME, &sql::insert(record)).await?;
        decode_inserted(rows)
    }

    async fn find_by_id(&self, id: u64) -> Result<E, StorageError> {
        let rows = fetch_rows(&self.pool, E::NAME, &sql::find_by_ids::<E>(&[id])).await?;
        match rows.into_iter().next() {
            Some(row) => decode(row),
            None => Err(StorageError::not_found(E::NAME, id)),
        }
    }

    async fn find_by_ids(&self, ids: &[u64]) -> Result<Vec<E>, StorageError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = fetch_rows(&self.pool, E::NAME, &sql::find_by_ids::<E>(ids)).await?;
        decode_all(rows)
    }

    async fn find_one_by(&self, column: &str, value: &ColumnValue) -> Result<E, StorageError> {
        let stmt = sql::find_by::<E>(column, value, Some(1))?;
        let rows = fetch_rows(&self.pool, E::NAME, &stmt).await?;
        match rows.into_iter().next() {
            Some(row) => decode(row),
            None => Err(StorageError::not_found(
                E::NAME,
                format!("{column}={}", value.to_json()),
            )),
        }
    }

    async fn find_all_by_tx(
        &self,
        tx: &mut dyn Transaction,
        column: &str,
        value: &ColumnValue,
    ) -> Result<Vec<E>, StorageError> {
        let stmt = sql::find_by::<E>(column, value, None)?;
        let conn = transaction::downcast(tx)?.connection()?;
        decode_all(fetch_rows(conn, E::NAME, &stmt).await?)
    }

    async fn update_by_id(
        &self,
        id: u64,
        changes: &[(&'static str, ColumnValue)],
    ) -> Result<(), StorageError> {
        let stmt = sql::update::<E>(id, changes)?;
        let affected = execute(&self.pool, E::NAME, &stmt).await?;
        require_updated::<E>(id, affected)
    }

    async fn update_by_id_tx(
        &self,
        tx: &mut dyn Transaction,
        id: u64,
        changes: &[(&'static str, ColumnValue)],
    ) -> Result<(), StorageError> {
        let stmt = sql::update::<E>(id, changes)?;
        let conn = transaction::downcast(tx)?.connection()?;
        let affected = execute(conn, E::NAME, &stmt).await?;
        require_updated::<E>(id, affected)
    }

    async fn delete_by_ids(&self, ids: &[u64]) -> Result<u64, StorageError> {
        if ids.is_empty() {
            return Ok(0);
        }
        execute(&self.pool, E::NAME, &sql::delete::<E>(ids)).await
    }

    async fn delete_by_ids_tx(&self, tx: &mut dyn Transaction, ids: &[u64]) -> Result<u64, StorageError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let conn = transaction::downcast(tx)?.connection()?;
        execute(conn, E::NAME, &sql::delete::<E>(ids)).await
    }

    async fn list(&self, query: &ListQuery) -> Result<Page<E>, StorageError> {
        let (count_stmt, page_stmt) = sql::list::<E>(query)?;
        let total = count(&self.pool, E::NAME, &count_stmt).await?;
        let list = decode_all(fetch_rows(&self.pool, E::NAME, &page_stmt).await?)?;
        Ok(Page { list, total })
    }
}
