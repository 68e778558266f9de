//! SQL text and argument building shared by every entity table.
//!
//! Rows are always read back as `to_jsonb(t)` and decoded through serde, so the
//! column set of a table only has to agree with the entity's field names.

use backoffice_core::{ColumnValue, Entity};
use backoffice_storage::{Filter, FilterOp, ListQuery, SortOrder, StorageError};
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx_core::query::Query;
use sqlx_core::types::Json;
use sqlx_postgres::{PgArguments, Postgres};

/// Owned bind argument.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SqlArg {
    Int(i64),
    Text(String),
    Bool(bool),
    Json(Value),
    Timestamp(DateTime<Utc>),
    IntList(Vec<i64>),
    TextList(Vec<String>),
}

/// Incrementally built statement with positional `$n` parameters.
#[derive(Debug, Default)]
pub(crate) struct SqlBuilder {
    pub(crate) sql: String,
    pub(crate) args: Vec<SqlArg>,
}

impl SqlBuilder {
    fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            args: Vec::new(),
        }
    }

    fn push(&mut self, sql: &str) -> &mut Self {
        self.sql.push_str(sql);
        self
    }

    fn push_arg(&mut self, arg: SqlArg) -> &mut Self {
        self.args.push(arg);
        self.sql.push_str(&format!("${}", self.args.len()));
        self
    }

    /// `NULL` is inlined so the column type drives inference.
    fn push_value(&mut self, value: &ColumnValue) -> &mut Self {
        match value {
            ColumnValue::Int(v) => self.push_arg(SqlArg::Int(*v)),
            ColumnValue::Text(v) => self.push_arg(SqlArg::Text(v.clone())),
            ColumnValue::Bool(v) => self.push_arg(SqlArg::Bool(*v)),
            ColumnValue::Json(v) => self.push_arg(SqlArg::Json(v.clone())),
            ColumnValue::Timestamp(v) => self.push_arg(SqlArg::Timestamp(*v)),
            ColumnValue::Null => self.push("NULL"),
        }
    }
}

pub(crate) fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn ensure_column<E: Entity>(column: &str) -> Result<(), StorageError> {
    if E::is_column(column) {
        Ok(())
    } else {
        Err(StorageError::validation(format!(
            "unknown column '{column}' for {}",
            E::NAME
        )))
    }
}

fn select_from<E: Entity>() -> SqlBuilder {
    SqlBuilder::new(format!("SELECT to_jsonb(t) FROM {} AS t", E::TABLE))
}

pub(crate) fn insert<E: Entity>(record: &E) -> SqlBuilder {
    let values = record.values();
    let columns: Vec<String> = values.iter().map(|(c, _)| quote_ident(c)).collect();

    let mut b = SqlBuilder::new(format!(
        "INSERT INTO {} AS t ({}, created_at, updated_at) VALUES (",
        E::TABLE,
        columns.join(", ")
    ));
    for (i, (_, value)) in values.iter().enumerate() {
        if i > 0 {
            b.push(", ");
        }
        b.push_value(value);
    }
    b.push(", now(), now()) RETURNING to_jsonb(t)");
    b
}

pub(crate) fn find_by_ids<E: Entity>(ids: &[u64]) -> SqlBuilder {
    let mut b = select_from::<E>();
    b.push(" WHERE id = ANY(")
        .push_arg(SqlArg::IntList(ids.iter().map(|id| *id as i64).collect()))
        .push(") ORDER BY id");
    b
}

pub(crate) fn find_by<E: Entity>(
    column: &str,
    value: &ColumnValue,
    limit: Option<u32>,
) -> Result<SqlBuilder, StorageError> {
    ensure_column::<E>(column)?;
    let mut b = select_from::<E>();
    push_filter(&mut b, &Filter::eq(column, value.clone()), " WHERE ");
    b.push(" ORDER BY id");
    if let Some(limit) = limit {
        b.push(&format!(" LIMIT {limit}"));
    }
    Ok(b)
}

pub(crate) fn update<E: Entity>(
    id: u64,
    changes: &[(&'static str, ColumnValue)],
) -> Result<SqlBuilder, StorageError> {
    let mut b = SqlBuilder::new(format!("UPDATE {} SET ", E::TABLE));
    for (column, value) in changes {
        ensure_column::<E>(column)?;
        if *column == "id" {
            return Err(StorageError::validation("id cannot be updated"));
        }
        b.push(&quote_ident(column)).push(" = ").push_value(value).push(", ");
    }
    b.push("updated_at = now() WHERE id = ")
        .push_arg(SqlArg::Int(id as i64));
    Ok(b)
}

pub(crate) fn delete<E: Entity>(ids: &[u64]) -> SqlBuilder {
    let mut b = SqlBuilder::new(format!("DELETE FROM {} WHERE id = ANY(", E::TABLE));
    b.push_arg(SqlArg::IntList(ids.iter().map(|id| *id as i64).collect()))
        .push(")");
    b
}

/// `(count, page)` statements for a listing.
pub(crate) fn list<E: Entity>(query: &ListQuery) -> Result<(SqlBuilder, SqlBuilder), StorageError> {
    query.validate::<E>()?;

    let mut count = SqlBuilder::new(format!("SELECT COUNT(*) FROM {} AS t", E::TABLE));
    let mut page = select_from::<E>();
    for (i, filter) in query.filters.iter().enumerate() {
        let glue = if i == 0 { " WHERE " } else { " AND " };
        push_filter(&mut count, filter, glue);
        push_filter(&mut page, filter, glue);
    }

    let order: Vec<String> = query
        .sort_keys()
        .into_iter()
        .map(|(column, order)| match order {
            SortOrder::Asc => format!("{} ASC NULLS FIRST", quote_ident(column)),
            SortOrder::Desc => format!("{} DESC NULLS LAST", quote_ident(column)),
        })
        .collect();
    if !order.is_empty() {
        page.push(" ORDER BY ").push(&order.join(", "));
    }
    if let Some(size) = query.page_size {
        page.push(&format!(" LIMIT {size} OFFSET {}", query.offset()));
    }
    Ok((count, page))
}

fn push_filter(b: &mut SqlBuilder, filter: &Filter, glue: &str) {
    let column = quote_ident(&filter.column);
    b.push(glue);
    match filter.op {
        FilterOp::In => {
            let ints: Option<Vec<i64>> = filter
                .values
                .iter()
                .map(|v| match v {
                    ColumnValue::Int(i) => Some(*i),
                    _ => None,
                })
                .collect();
            match ints {
                Some(ints) => {
                    b.push(&column).push(" = ANY(").push_arg(SqlArg::IntList(ints));
                }
                None => {
                    let texts = filter
                        .values
                        .iter()
                        .filter_map(ColumnValue::as_text)
                        .collect();
                    b.push(&column)
                        .push("::text = ANY(")
                        .push_arg(SqlArg::TextList(texts));
                }
            }
            b.push(")");
        }
        FilterOp::Like => {
            let needle = filter
                .value()
                .and_then(ColumnValue::as_text)
                .unwrap_or_default();
            b.push(&column)
                .push("::text LIKE ")
                .push_arg(SqlArg::Text(format!("%{}%", needle.trim_matches('%'))));
        }
        op => match filter.value() {
            Some(ColumnValue::Null) | None => {
                let test = if op == FilterOp::Neq { " IS NOT NULL" } else { " IS NULL" };
                b.push(&column).push(test);
            }
            Some(value) => {
                b.push(&column).push(" ").push(op.sql()).push(" ").push_value(value);
            }
        },
    }
}

/// Attach every argument of `args` in order.
pub(crate) fn bind_args<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    args: &'q [SqlArg],
) -> Query<'q, Postgres, PgArguments> {
    for arg in args {
        query = match arg {
            SqlArg::Int(v) => query.bind(*v),
            SqlArg::Text(v) => query.bind(v.as_str()),
            SqlArg::Bool(v) => query.bind(*v),
            SqlArg::Json(v) => query.bind(Json(v)),
            SqlArg::Timestamp(v) => query.bind(*v),
            SqlArg::IntList(v) => query.bind(v.as_slice()),
            SqlArg::TextList(v) => query.bind(v.as_slice()),
        };
    }
    query
}

#[cfg(test)]
mod tests {
    use super::*;
    use backoffice_core::{Config, Menu, Role};

    #[test]
    fn test_insert_inlines_null() {
        let b = insert(&Menu::default());
        assert!(b.sql.starts_with("INSERT INTO t_menu AS t (\"parent_id\", \"name\", \"type\""));
        assert!(b.sql.contains("NULL"));
        assert!(b.sql.ends_with("RETURNING to_jsonb(t)"));
        // every column except the two NULLs gets a parameter
        assert_eq!(b.args.len(), Menu::COLUMNS.len() - 2);
    }

    #[test]
    fn test_update_is_sparse() {
        let b = update::<Config>(7, &[("value", ColumnValue::from("v"))]).unwrap();
        assert_eq!(
            b.sql,
            "UPDATE t_config SET \"value\" = $1, updated_at = now() WHERE id = $2"
        );
        assert_eq!(b.args, vec![SqlArg::Text("v".into()), SqlArg::Int(7)]);
    }

    #[test]
    fn test_update_rejects_unknown_column() {
        let err = update::<Role>(1, &[("password", ColumnValue::from("x"))]).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_list_filters_and_paging() {
        let query = ListQuery::new()
            .with_page(2, 10)
            .with_sort("sort,-id")
            .with_filter(Filter::new("name", FilterOp::Like, "adm"))
            .with_filter(Filter::eq("status", 1));
        let (count, page) = list::<Role>(&query).unwrap();

        assert_eq!(
            count.sql,
            "SELECT COUNT(*) FROM t_role AS t WHERE \"name\"::text LIKE $1 AND \"status\" = $2"
        );
        assert!(page.sql.ends_with(
            "ORDER BY \"sort\" ASC NULLS FIRST, \"id\" DESC NULLS LAST LIMIT 10 OFFSET 20"
        ));
        assert_eq!(page.args[0], SqlArg::Text("%adm%".into()));
    }

    #[test]
    fn test_in_filter_with_ints_uses_array() {
        let query = ListQuery::all().with_filter(Filter::is_in("role_id", [1u64, 2]));
        let (_, page) = list::<backoffice_core::RoleMenu>(&query).unwrap();
        assert!(page.sql.contains("\"role_id\" = ANY($1)"));
        assert_eq!(page.args, vec![SqlArg::IntList(vec![1, 2])]);
        assert!(!page.sql.contains("LIMIT"));
    }

    #[test]
    fn test_find_by_checks_column() {
        assert!(find_by::<Config>("key", &"site".into(), Some(1)).is_ok());
        assert!(find_by::<Config>("nope", &"site".into(), Some(1)).is_err());
    }
}
