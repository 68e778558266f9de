//! Entity descriptor shared by every persisted record type.
//!
//! A single generic cache/DAO stack is parametrized over this trait: the
//! associated constants carry what differs between entity types (table,
//! cache key prefix, TTL, secondary lookup column), the methods expose the
//! row data needed for inserts and sparse patches.

use std::fmt::Debug;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::value::ColumnValue;

/// TTL applied to cached entity rows.
pub const DEFAULT_ENTITY_TTL: Duration = Duration::from_secs(5 * 60);

/// TTL applied to negative-cache placeholders.
pub const PLACEHOLDER_TTL: Duration = Duration::from_secs(10 * 60);

/// `status` value of an enabled platform account or role.
pub const STATUS_NORMAL: i32 = 1;

/// Columns every table carries in addition to [`Entity::COLUMNS`].
pub const META_COLUMNS: &[&str] = &["id", "created_at", "updated_at"];

pub trait Entity: Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static {
    /// Short entity name used in logs, metrics and error messages.
    const NAME: &'static str;
    const TABLE: &'static str;
    /// Cache namespace, ending with the `:` separator.
    const CACHE_PREFIX: &'static str;
    const CACHE_TTL: Duration = DEFAULT_ENTITY_TTL;
    /// Column holding a secondary unique lookup key.
    const SECONDARY_KEY: Option<&'static str> = None;
    /// Data columns, excluding [`META_COLUMNS`].
    const COLUMNS: &'static [&'static str];
    /// Columns carrying a unique constraint.
    const UNIQUE_COLUMNS: &'static [&'static str] = &[];

    fn id(&self) -> u64;

    fn set_id(&mut self, id: u64);

    fn set_timestamps(&mut self, created_at: DateTime<Utc>, updated_at: DateTime<Utc>);

    /// Every data column with its current value, used for inserts.
    fn values(&self) -> Vec<(&'static str, ColumnValue)>;

    /// Only the columns holding a non-zero value. Zero values mean "not
    /// provided" and never overwrite a stored column.
    fn changes(&self) -> Vec<(&'static str, ColumnValue)>;

    /// Current value of the [`Entity::SECONDARY_KEY`] column.
    fn secondary_key(&self) -> Option<String> {
        None
    }

    fn is_column(name: &str) -> bool {
        META_COLUMNS.contains(&name) || Self::COLUMNS.contains(&name)
    }
}

/// Push `(column, value)` when the string is not empty.
pub(crate) fn push_text(out: &mut Vec<(&'static str, ColumnValue)>, column: &'static str, v: &str) {
    if !v.is_empty() {
        out.push((column, ColumnValue::Text(v.to_string())));
    }
}

/// Push `(column, value)` when the integer is not zero.
pub(crate) fn push_int(out: &mut Vec<(&'static str, ColumnValue)>, column: &'static str, v: i64) {
    if v != 0 {
        out.push((column, ColumnValue::Int(v)));
    }
}
