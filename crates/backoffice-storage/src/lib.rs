//! # backoffice-storage
//!
//! Relational storage abstraction for the backoffice server.
//!
//! This crate only defines the contract; backends live in
//! `backoffice-db-memory` and `backoffice-db-postgres`.
//!
//! ## Overview
//!
//! - [`RelationalStore`]: row-level CRUD plus filtered, paginated listing,
//!   generic over any [`backoffice_core::Entity`].
//! - [`Transaction`] / [`TransactionManager`]: caller-managed transactions.
//!   Write operations have `_tx` variants that run inside one.
//! - [`StorageError`]: failure taxonomy. A missing row is always reported as
//!   [`StorageError::NotFound`], distinct from every infrastructure failure.

pub mod error;
pub mod query;
pub mod traits;

pub use error::{ErrorCategory, StorageError};
pub use query::{Filter, FilterOp, ListQuery, Page, SortOrder};
pub use traits::{RelationalStore, Transaction, TransactionManager};
