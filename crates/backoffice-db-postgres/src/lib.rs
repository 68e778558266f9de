//! PostgreSQL storage backend.
//!
//! [`PostgresStore`] implements [`backoffice_storage::RelationalStore`] for
//! every entity over one connection pool. Statements are generated from the
//! entity descriptor and rows are read back as JSONB, so adding a column only
//! touches the entity type and the schema migration.

pub mod error;
pub mod migrations;
pub mod pool;
mod sql;
pub mod store;
pub mod transaction;

pub use error::{PostgresError, Result};
pub use pool::{PgPoolOptions, create_pool, mask_password};
pub use store::PostgresStore;
pub use transaction::PostgresTransaction;
