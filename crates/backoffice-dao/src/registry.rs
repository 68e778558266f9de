use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Duration;

use backoffice_cache::CacheStore;
use backoffice_core::{Config, Menu, Platform, Role, RoleMenu};
use backoffice_storage::{RelationalStore, TransactionManager};

use crate::dao::Dao;
use crate::error::DaoError;
use crate::menu::Route;

/// One DAO per entity over a shared store and cache.
///
/// Built once at startup and handed to whatever needs data access.
#[derive(Clone)]
pub struct Daos {
    pub config: Dao<Config>,
    pub menu: Dao<Menu>,
    pub platform: Dao<Platform>,
    pub role: Dao<Role>,
    pub role_menu: Dao<RoleMenu>,
}

impl Daos {
    pub fn new<S>(store: Arc<S>, cache: Option<Arc<dyn CacheStore>>) -> Self
    where
        S: RelationalStore<Config>
            + RelationalStore<Menu>
            + RelationalStore<Platform>
            + RelationalStore<Role>
            + RelationalStore<RoleMenu>
            + TransactionManager
            + 'static,
    {
        let transactions: Arc<dyn TransactionManager> = store.clone();
        Self {
            config: Dao::<Config>::new(store.clone(), transactions.clone(), cache.clone()),
            menu: Dao::<Menu>::new(store.clone(), transactions.clone(), cache.clone()),
            platform: Dao::<Platform>::new(store.clone(), transactions.clone(), cache.clone()),
            role: Dao::<Role>::new(store.clone(), transactions.clone(), cache.clone()),
            role_menu: Dao::<RoleMenu>::new(store, transactions, cache),
        }
    }

    /// Apply one TTL to every entity cache.
    #[must_use]
    pub fn with_cache_ttl(self, ttl: Duration) -> Self {
        Self {
            config: self.config.with_cache_ttl(ttl),
            menu: self.menu.with_cache_ttl(ttl),
            platform: self.platform.with_cache_ttl(ttl),
            role: self.role.with_cache_ttl(ttl),
            role_menu: self.role_menu.with_cache_ttl(ttl),
        }
    }

    /// Distinct non-empty permission marks of the menus bound to `role_ids`,
    /// sorted.
    pub async fn role_permissions(&self, role_ids: &[u64]) -> Result<Vec<String>, DaoError> {
        let menu_ids = self.role_menu.menu_ids_for_roles(role_ids).await?;
        let menus = self.menu.get_by_ids(&menu_ids).await?;
        let perms: BTreeSet<String> = menus
            .into_values()
            .map(|menu| menu.perm)
            .filter(|perm| !perm.is_empty())
            .collect();
        Ok(perms.into_iter().collect())
    }

    /// Navigation routes for `role_ids`; an empty list means every menu.
    pub async fn routes(&self, role_ids: &[u64]) -> Result<Vec<Route>, DaoError> {
        if role_ids.is_empty() {
            return self.menu.routes(None).await;
        }
        let allowed: HashSet<u64> = self
            .role_menu
            .menu_ids_for_roles(role_ids)
            .await?
            .into_iter()
            .collect();
        self.menu.routes(Some(&allowed)).await
    }
}
