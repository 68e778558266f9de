//! Pool construction for the PostgreSQL store.

use sqlx_core::query::query;
use sqlx_postgres::PgPool;
use tracing::{debug, info, instrument};

use crate::error::Result;

pub use sqlx_postgres::PgPoolOptions;

/// Open a pool with `options` and check that it answers a trivial query.
#[instrument(skip(options), fields(url = %mask_password(url)))]
pub async fn create_pool(url: &str, options: PgPoolOptions) -> Result<PgPool> {
    info!(
        max_connections = options.get_max_connections(),
        min_connections = options.get_min_connections(),
        "Opening PostgreSQL pool"
    );
    let pool = options.connect(url).await?;
    query("SELECT 1").execute(&pool).await?;
    debug!("PostgreSQL pool answered");
    Ok(pool)
}

/// Replace the password in a connection URL with `****` for logging.
pub fn mask_password(url: &str) -> String {
    let authority_start = url.find("://").map_or(0, |p| p + 3);
    if let Some(at) = url.rfind('@')
        && at > authority_start
        && let Some(colon) = url[authority_start..at].find(':')
    {
        let colon = authority_start + colon;
        return format!("{}:****{}", &url[..colon], &url[at..]);
    }
    url.to_string()
}
