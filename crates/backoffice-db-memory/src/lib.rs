//! In-memory relational storage backend.
//!
//! One [`InMemoryStore`] serves every entity table. Rows are kept as JSON
//! objects keyed by column name, so filtering and sparse updates work the
//! same way for all entity types.
//!
//! # Example
//!
//! ```ignore
//! use backoffice_core::Config;
//! use backoffice_db_memory::InMemoryStore;
//! use backoffice_storage::RelationalStore;
//!
//! let store = InMemoryStore::new();
//! let created = RelationalStore::<Config>::insert(&store, &config).await?;
//! ```

mod table;
pub mod store;
pub mod transaction;

pub use store::InMemoryStore;
pub use transaction::MemoryTransaction;
