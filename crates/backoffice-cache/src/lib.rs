//! Cache-aside building blocks.
//!
//! - [`CacheStore`]: byte-level key/value store with a negative-cache
//!   placeholder, backed by an in-process map ([`MemoryCache`]) or Redis
//!   ([`RedisCache`]).
//! - [`EntityCache`]: typed, per-entity key namespacing over a store.
//! - [`SingleFlight`]: collapses concurrent loads of the same key into one.
//! - [`CacheMode`] / [`create_cache_store`]: configuration-driven selection.

pub mod entity;
pub mod error;
pub mod memory;
pub mod metrics;
pub mod mode;
pub mod remote;
pub mod singleflight;
pub mod store;

pub use entity::EntityCache;
pub use error::CacheError;
pub use memory::MemoryCache;
pub use mode::{CacheMode, RedisSettings, create_cache_store};
pub use remote::RedisCache;
pub use singleflight::SingleFlight;
pub use store::CacheStore;
