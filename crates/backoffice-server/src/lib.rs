pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod observability;
pub mod server;
pub mod state;

pub use config::{AppConfig, AuthConfig, CacheConfig, ServerConfig, StorageConfig, UploadConfig};
pub use observability::init_tracing;
pub use server::{API_PREFIX, BackofficeServer, ServerBuilder, build_app};
pub use state::AppState;
