//! Startup wiring: storage backend, cache, DAOs, enum dictionaries and the
//! optional bootstrap admin account.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use backoffice_cache::create_cache_store;
use backoffice_core::{EnumRegistry, Platform, Role, STATUS_NORMAL};
use backoffice_dao::Daos;
use backoffice_db_memory::InMemoryStore;
use backoffice_db_postgres::{PostgresStore, mask_password};
use backoffice_storage::{Filter, ListQuery};
use tracing::{info, warn};

use crate::auth::{TokenService, hash_password};
use crate::config::{AdminUserConfig, AppConfig};
use crate::state::AppState;

/// Build the DAOs over the configured store and cache.
pub async fn build_daos(cfg: &AppConfig) -> anyhow::Result<Daos> {
    let cache = create_cache_store(cfg.cache_mode(), &cfg.redis, cfg.cache.placeholder_ttl())
        .await
        .context("failed to initialize cache")?;

    let daos = match cfg.storage.backend.as_str() {
        "memory" => {
            warn!("Using in-memory storage, data is lost on restart");
            Daos::new(Arc::new(InMemoryStore::new()), cache)
        }
        _ => {
            let pg = &cfg.storage.postgres;
            let url = pg.connection_url();
            info!(url = %mask_password(&url), "Connecting to PostgreSQL");
            let store = PostgresStore::connect(&url, pg.pool_options())
                .await
                .context("failed to initialize PostgreSQL storage")?;
            if pg.run_migrations {
                store.migrate().await.context("failed to run migrations")?;
            }
            Daos::new(Arc::new(store), cache)
        }
    };

    Ok(daos.with_cache_ttl(cfg.cache.entity_ttl()))
}

pub async fn build_state(cfg: &AppConfig) -> anyhow::Result<AppState> {
    let daos = build_daos(cfg).await?;

    if let Some(admin) = &cfg.bootstrap.admin_user {
        bootstrap_admin(&daos, admin)
            .await
            .context("failed to bootstrap admin account")?;
    }

    let enums = EnumRegistry::load_or_empty(&cfg.enums.path);
    info!(count = enums.len(), path = %cfg.enums.path, "enum dictionaries loaded");

    let tokens = TokenService::new(
        &cfg.auth.jwt_secret,
        Duration::from_secs(cfg.auth.token_ttl_secs),
        Duration::from_secs(cfg.auth.renew_window_secs),
    );

    Ok(AppState {
        daos,
        enums: Arc::new(enums),
        tokens: Arc::new(tokens),
        upload: Arc::new(cfg.upload.clone()),
    })
}

/// Create the admin account (and its role) unless the username is taken.
/// Returns the account id.
pub async fn bootstrap_admin(daos: &Daos, admin: &AdminUserConfig) -> anyhow::Result<u64> {
    match daos.platform.get_by_username(&admin.username).await {
        Ok(existing) => {
            info!(username = %admin.username, "admin account already exists");
            return Ok(existing.id);
        }
        Err(e) if e.is_not_found() => {}
        Err(e) => return Err(e.into()),
    }

    let query = ListQuery::all().with_filter(Filter::eq("code", admin.role_code.as_str()));
    let role_id = match daos.role.list(&query).await?.list.first() {
        Some(role) => role.id,
        None => {
            let role = daos
                .role
                .create(&Role {
                    name: admin.role_code.clone(),
                    code: admin.role_code.clone(),
                    sort: 1,
                    status: STATUS_NORMAL,
                    ..Default::default()
                })
                .await?;
            info!(code = %role.code, id = role.id, "admin role created");
            role.id
        }
    };

    let password = hash_password(&admin.password)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {e}"))?;
    let platform = daos
        .platform
        .create(&Platform {
            username: admin.username.clone(),
            password,
            nickname: admin.username.clone(),
            role_id: vec![role_id],
            status: Some(STATUS_NORMAL),
            ..Default::default()
        })
        .await?;

    info!(username = %admin.username, id = platform.id, "admin account created");
    Ok(platform.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::verify_password;

    fn memory_config() -> AppConfig {
        let mut cfg = AppConfig::default();
        cfg.storage.backend = "memory".into();
        cfg
    }

    fn admin() -> AdminUserConfig {
        AdminUserConfig {
            username: "root".into(),
            password: "root-pass".into(),
            role_code: "admin".into(),
        }
    }

    #[tokio::test]
    async fn test_bootstrap_admin_is_idempotent() {
        let daos = tokio_test::assert_ok!(build_daos(&memory_config()).await);
        assert!(daos.platform.is_cached());

        let first = tokio_test::assert_ok!(bootstrap_admin(&daos, &admin()).await);
        let second = tokio_test::assert_ok!(bootstrap_admin(&daos, &admin()).await);
        assert_eq!(first, second);

        let roles = daos.role.list(&ListQuery::all()).await.unwrap();
        assert_eq!(roles.total, 1);
        assert_eq!(roles.list[0].code, "admin");

        let account = daos.platform.get_by_id(first).await.unwrap();
        assert!(account.is_normal());
        assert_eq!(account.role_id, vec![roles.list[0].id]);
        assert!(verify_password("root-pass", &account.password).unwrap());
    }

    #[tokio::test]
    async fn test_disabled_cache_builds_uncached_daos() {
        let mut cfg = memory_config();
        cfg.cache.mode = "none".into();
        let daos = build_daos(&cfg).await.unwrap();
        assert!(!daos.config.is_cached());
    }

    #[tokio::test]
    async fn test_unreachable_redis_aborts_startup() {
        let mut cfg = memory_config();
        cfg.cache.mode = "redis".into();
        cfg.redis.url = "redis://127.0.0.1:1".into();
        cfg.redis.timeout_ms = 200;
        let err = tokio_test::assert_err!(build_daos(&cfg).await.map(|_| ()));
        assert!(err.to_string().contains("cache"));
    }

    #[tokio::test]
    async fn test_build_state_loads_missing_enums_as_empty() {
        let mut cfg = memory_config();
        cfg.enums.path = "/nonexistent/enums.json".into();
        let state = build_state(&cfg).await.unwrap();
        assert!(state.enums.is_empty());
        assert_eq!(state.tokens.ttl(), Duration::from_secs(7200));
    }
}
