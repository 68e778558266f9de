use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use backoffice_core::{ColumnValue, Entity};
use backoffice_storage::{Filter, FilterOp, ListQuery, Page, SortOrder, StorageError};
use chrono::{DateTime, Utc};
use serde_json::Value;

#[derive(Debug, Clone, Default)]
pub(crate) struct Table {
    rows: BTreeMap<u64, Value>,
    last_id: u64,
}

/// All tables, keyed by table name. Cloned wholesale to stage a transaction.
#[derive(Debug, Clone, Default)]
pub(crate) struct Tables {
    tables: HashMap<&'static str, Table>,
}

impl Tables {
    fn rows(&self, table: &str) -> impl Iterator<Item = (&u64, &Value)> {
        self.tables.get(table).into_iter().flat_map(|t| t.rows.iter())
    }

    fn table_mut(&mut self, table: &'static str) -> &mut Table {
        self.tables.entry(table).or_default()
    }

    pub(crate) fn insert<E: Entity>(&mut self, record: &E) -> Result<E, StorageError> {
        let now = Utc::now();
        let table = self.table_mut(E::TABLE);
        table.last_id += 1;

        let mut record = record.clone();
        record.set_id(table.last_id);
        record.set_timestamps(now, now);

        let row = serde_json::to_value(&record).map_err(|e| StorageError::internal(e.to_string()))?;
        check_unique::<E>(table, &row, None)?;
        table.rows.insert(record.id(), row);
        Ok(record)
    }

    pub(crate) fn get<E: Entity>(&self, id: u64) -> Result<Option<E>, StorageError> {
        self.tables
            .get(E::TABLE)
            .and_then(|t| t.rows.get(&id))
            .map(decode::<E>)
            .transpose()
    }

    /// Rows matching every filter, in id order.
    pub(crate) fn find<E: Entity>(&self, filters: &[Filter]) -> Result<Vec<E>, StorageError> {
        self.rows(E::TABLE)
            .filter(|(_, row)| filters.iter().all(|f| matches(row, f)))
            .map(|(_, row)| decode::<E>(row))
            .collect()
    }

    pub(crate) fn update<E: Entity>(
        &mut self,
        id: u64,
        changes: &[(&'static str, ColumnValue)],
    ) -> Result<(), StorageError> {
        let table = self.table_mut(E::TABLE);
        let Some(current) = table.rows.get(&id) else {
            return Err(StorageError::not_found(E::NAME, id));
        };

        let mut row = current.clone();
        let Some(obj) = row.as_object_mut() else {
            return Err(StorageError::internal(format!("{} row {id} is not an object", E::NAME)));
        };
        for (column, value) in changes {
            if !E::is_column(column) {
                return Err(StorageError::validation(format!(
                    "unknown column '{column}' for {}",
                    E::NAME
                )));
            }
            obj.insert((*column).to_string(), value.to_json());
        }
        obj.insert(
            "updated_at".to_string(),
            ColumnValue::Timestamp(Utc::now()).to_json(),
        );

        // reject patches that would leave the row undecodable
        decode::<E>(&row).map_err(|e| StorageError::validation(e.to_string()))?;
        check_unique::<E>(table, &row, Some(id))?;
        table.rows.insert(id, row);
        Ok(())
    }

    pub(crate) fn delete<E: Entity>(&mut self, ids: &[u64]) -> u64 {
        let table = self.table_mut(E::TABLE);
        ids.iter()
            .filter(|id| table.rows.remove(*id).is_some())
            .count() as u64
    }

    pub(crate) fn list<E: Entity>(&self, query: &ListQuery) -> Result<Page<E>, StorageError> {
        query.validate::<E>()?;

        let mut rows: Vec<&Value> = self
            .rows(E::TABLE)
            .filter(|(_, row)| query.filters.iter().all(|f| matches(row, f)))
            .map(|(_, row)| row)
            .collect();
        let total = rows.len() as u64;

        let keys = query.sort_keys();
        rows.sort_by(|a, b| {
            keys.iter()
                .map(|(column, order)| {
                    let ord = json_cmp(
                        a.get(*column).unwrap_or(&Value::Null),
                        b.get(*column).unwrap_or(&Value::Null),
                    );
                    match order {
                        SortOrder::Asc => ord,
                        SortOrder::Desc => ord.reverse(),
                    }
                })
                .find(|ord| *ord != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });

        let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let limit = query.page_size.map_or(usize::MAX, |s| s as usize);
        let list = rows
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(decode::<E>)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page { list, total })
    }
}

fn decode<E: Entity>(row: &Value) -> Result<E, StorageError> {
    serde_json::from_value::<E>(row.clone()).map_err(|e| StorageError::internal(format!("decode {}: {e}", E::NAME)))
}

fn check_unique<E: Entity>(table: &Table, row: &Value, exclude: Option<u64>) -> Result<(), StorageError> {
    for column in E::UNIQUE_COLUMNS {
        let value = match row.get(*column) {
            None | Some(Value::Null) => continue,
            Some(Value::String(s)) if s.is_empty() => continue,
            Some(v) => v,
        };
        let taken = table
            .rows
            .iter()
            .any(|(id, other)| Some(*id) != exclude && other.get(*column) == Some(value));
        if taken {
            return Err(StorageError::conflict(format!(
                "{}.{column} = {value} already exists",
                E::NAME
            )));
        }
    }
    Ok(())
}

fn matches(row: &Value, filter: &Filter) -> bool {
    let field = row.get(&filter.column).unwrap_or(&Value::Null);
    match filter.op {
        FilterOp::In => filter
            .values
            .iter()
            .any(|v| compare(field, v) == Some(Ordering::Equal)),
        FilterOp::Like => match (text_of(field), filter.value().and_then(ColumnValue::as_text)) {
            (Some(haystack), Some(needle)) => haystack.contains(needle.trim_matches('%')),
            _ => false,
        },
        op => {
            let Some(ord) = filter.value().and_then(|v| compare(field, v)) else {
                return op == FilterOp::Neq;
            };
            match op {
                FilterOp::Eq => ord == Ordering::Equal,
                FilterOp::Neq => ord != Ordering::Equal,
                FilterOp::Gt => ord == Ordering::Greater,
                FilterOp::Gte => ord != Ordering::Less,
                FilterOp::Lt => ord == Ordering::Less,
                FilterOp::Lte => ord != Ordering::Greater,
                FilterOp::In | FilterOp::Like => false,
            }
        }
    }
}

/// Ordering of a stored field relative to a filter value, `None` when the
/// two are not comparable.
fn compare(field: &Value, value: &ColumnValue) -> Option<Ordering> {
    match value {
        ColumnValue::Int(v) => match field {
            Value::Number(n) => n.as_i64().map(|n| n.cmp(v)),
            Value::String(s) => s.parse::<i64>().ok().map(|n| n.cmp(v)),
            _ => None,
        },
        ColumnValue::Text(v) => match field {
            Value::String(s) => Some(s.as_str().cmp(v.as_str())),
            Value::Number(n) => {
                let v = v.parse::<i64>().ok()?;
                n.as_i64().map(|n| n.cmp(&v))
            }
            Value::Bool(b) => Some(b.to_string().as_str().cmp(v.as_str())),
            _ => None,
        },
        ColumnValue::Bool(v) => field.as_bool().map(|b| b.cmp(v)),
        ColumnValue::Timestamp(v) => field
            .as_str()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|t| t.with_timezone(&Utc).cmp(v)),
        ColumnValue::Json(v) => (field == v).then_some(Ordering::Equal),
        ColumnValue::Null => field.is_null().then_some(Ordering::Equal),
    }
}

fn text_of(field: &Value) -> Option<String> {
    match field {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn json_cmp(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => x
                .as_f64()
                .partial_cmp(&y.as_f64())
                .unwrap_or(Ordering::Equal),
        },
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_compare_mixed_types() {
        assert_eq!(compare(&json!(5), &ColumnValue::Int(5)), Some(Ordering::Equal));
        assert_eq!(compare(&json!("5"), &ColumnValue::Int(7)), Some(Ordering::Less));
        assert_eq!(
            compare(&json!(9), &ColumnValue::Text("3".into())),
            Some(Ordering::Greater)
        );
        assert_eq!(compare(&json!([1]), &ColumnValue::Int(1)), None);
    }

    #[test]
    fn test_like_is_substring() {
        let row = json!({"name": "System settings"});
        assert!(matches(&row, &Filter::new("name", FilterOp::Like, "settings")));
        assert!(matches(&row, &Filter::new("name", FilterOp::Like, "%System%")));
        assert!(!matches(&row, &Filter::new("name", FilterOp::Like, "users")));
    }

    #[test]
    fn test_in_filter() {
        let row = json!({"role_id": 3});
        assert!(matches(&row, &Filter::is_in("role_id", [1u64, 3])));
        assert!(!matches(&row, &Filter::is_in("role_id", [2u64])));
    }

    #[test]
    fn test_neq_on_missing_field() {
        let row = json!({});
        assert!(matches(&row, &Filter::new("perm", FilterOp::Neq, "")));
    }

    #[test]
    fn test_json_cmp_null_first() {
        assert_eq!(json_cmp(&Value::Null, &json!(1)), Ordering::Less);
        assert_eq!(json_cmp(&json!(2), &json!(10)), Ordering::Less);
        assert_eq!(json_cmp(&json!("b"), &json!("a")), Ordering::Greater);
    }
}
