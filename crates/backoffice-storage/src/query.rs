//! Filtered, sorted and paginated listing.

use backoffice_core::{ColumnValue, Entity};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::StorageError;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Substring match on the text form of the column.
    Like,
    In,
}

impl FilterOp {
    pub fn parse(op: &str) -> Option<Self> {
        Some(match op {
            "eq" => Self::Eq,
            "neq" => Self::Neq,
            "gt" => Self::Gt,
            "gte" => Self::Gte,
            "lt" => Self::Lt,
            "lte" => Self::Lte,
            "like" => Self::Like,
            "in" => Self::In,
            _ => return None,
        })
    }

    pub fn sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Neq => "<>",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Like => "LIKE",
            Self::In => "IN",
        }
    }
}

/// A column predicate. `values` holds exactly one value except for
/// [`FilterOp::In`].
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub values: Vec<ColumnValue>,
}

impl Filter {
    pub fn new(column: impl Into<String>, op: FilterOp, value: impl Into<ColumnValue>) -> Self {
        Self {
            column: column.into(),
            op,
            values: vec![value.into()],
        }
    }

    pub fn eq(column: impl Into<String>, value: impl Into<ColumnValue>) -> Self {
        Self::new(column, FilterOp::Eq, value)
    }

    pub fn is_in<V: Into<ColumnValue>>(
        column: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self {
            column: column.into(),
            op: FilterOp::In,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn value(&self) -> Option<&ColumnValue> {
        self.values.first()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// List request. Filters are AND-combined.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    /// Zero-based page index.
    pub page: u32,
    /// `None` returns every matching row.
    pub page_size: Option<u32>,
    /// Comma-separated columns, `-` prefix for descending.
    pub sort: String,
    pub filters: Vec<Filter>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: 0,
            page_size: Some(DEFAULT_PAGE_SIZE),
            sort: "-id".to_string(),
            filters: Vec::new(),
        }
    }
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every matching row, no pagination.
    pub fn all() -> Self {
        Self {
            page_size: None,
            ..Self::default()
        }
    }

    pub fn with_page(mut self, page: u32, page_size: u32) -> Self {
        self.page = page;
        self.page_size = Some(page_size.clamp(1, MAX_PAGE_SIZE));
        self
    }

    pub fn with_sort(mut self, sort: impl Into<String>) -> Self {
        let sort = sort.into();
        if !sort.trim().is_empty() {
            self.sort = sort;
        }
        self
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Restrict `created_at` to the inclusive `[start, end]` range.
    pub fn with_created_between(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.filters
            .push(Filter::new("created_at", FilterOp::Gte, start));
        self.filters.push(Filter::new("created_at", FilterOp::Lte, end));
        self
    }

    pub fn offset(&self) -> u64 {
        match self.page_size {
            Some(size) => u64::from(self.page) * u64::from(size),
            None => 0,
        }
    }

    /// Parsed sort keys.
    pub fn sort_keys(&self) -> Vec<(&str, SortOrder)> {
        self.sort
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| match s.strip_prefix('-') {
                Some(column) => (column, SortOrder::Desc),
                None => (s.strip_prefix('+').unwrap_or(s), SortOrder::Asc),
            })
            .collect()
    }

    /// Reject unknown columns and malformed filters before they reach a backend.
    pub fn validate<E: Entity>(&self) -> Result<(), StorageError> {
        for (column, _) in self.sort_keys() {
            if !E::is_column(column) {
                return Err(StorageError::validation(format!(
                    "unknown sort column '{column}' for {}",
                    E::NAME
                )));
            }
        }
        for filter in &self.filters {
            if !E::is_column(&filter.column) {
                return Err(StorageError::validation(format!(
                    "unknown filter column '{}' for {}",
                    filter.column,
                    E::NAME
                )));
            }
            match filter.op {
                FilterOp::In if filter.values.is_empty() => {
                    return Err(StorageError::validation(format!(
                        "'in' filter on '{}' needs at least one value",
                        filter.column
                    )));
                }
                FilterOp::In => {}
                _ if filter.values.len() != 1 => {
                    return Err(StorageError::validation(format!(
                        "filter on '{}' needs exactly one value",
                        filter.column
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// One page of results plus the total number of matching rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<E> {
    pub list: Vec<E>,
    pub total: u64,
}

impl<E> Page<E> {
    pub fn map<T>(self, f: impl FnMut(E) -> T) -> Page<T> {
        Page {
            list: self.list.into_iter().map(f).collect(),
            total: self.total,
        }
    }
}
