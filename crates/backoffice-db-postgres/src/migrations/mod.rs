//! Embedded schema migrations, applied programmatically at startup so the
//! server ships as a single binary.

use std::borrow::Cow;

use sqlx_core::migrate::{Migration, MigrationType, Migrator};
use sqlx_postgres::PgPool;
use tracing::{info, instrument};

use crate::error::{PostgresError, Result};

/// `(version, description, sql)` in apply order. New migrations go in
/// `migrations/` and get an entry here.
macro_rules! embedded_migrations {
    () => {
        &[(
            20250601000001i64,
            "initial_schema",
            include_str!("../../migrations/20250601000001_initial_schema.sql"),
        )]
    };
}

fn build_migrations() -> Vec<Migration> {
    embedded_migrations!()
        .iter()
        .map(|(version, description, sql)| Migration {
            version: *version,
            description: Cow::Borrowed(description),
            migration_type: MigrationType::Simple,
            sql: Cow::Borrowed(sql),
            checksum: Cow::Borrowed(&[]),
            no_tx: false,
        })
        .collect()
}

/// Runs all pending migrations. Applied versions are tracked in
/// `_sqlx_migrations`.
#[instrument(skip(pool))]
pub async fn run(pool: &PgPool) -> Result<()> {
    let migrations = build_migrations();
    info!(count = migrations.len(), "Running database migrations (embedded)");

    let migrator = Migrator {
        migrations: Cow::Owned(migrations),
        ignore_missing: false,
        locking: true,
        no_tx: false,
    };

    migrator
        .run(pool)
        .await
        .map_err(|e| PostgresError::Migration(format!("Migration failed: {e}")))?;

    info!("Database migrations completed successfully");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_ordered_and_non_empty() {
        let migrations = build_migrations();
        assert!(!migrations.is_empty());
        assert!(migrations.windows(2).all(|w| w[0].version < w[1].version));
        assert!(migrations[0].sql.contains("CREATE TABLE IF NOT EXISTS t_config"));
    }
}
