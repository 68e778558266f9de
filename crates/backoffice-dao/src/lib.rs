//! Data access for backoffice entities.
//!
//! [`Dao`] implements cache-aside reads with negative caching and
//! single-flight loads, and invalidate-on-write for mutations, identically
//! for every [`backoffice_core::Entity`]. Entity-specific helpers live in
//! inherent impls next to it, and [`Daos`] bundles one DAO per entity.

pub mod config;
pub mod dao;
pub mod error;
pub mod menu;
pub mod platform;
pub mod registry;
pub mod role;
pub mod role_menu;

pub use config::IMAGE_DOMAIN_KEY;
pub use dao::Dao;
pub use error::DaoError;
pub use menu::{Route, RouteMeta, build_options, build_routes};
pub use registry::Daos;
