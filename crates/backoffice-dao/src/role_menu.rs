use std::collections::BTreeSet;

use backoffice_core::{ColumnValue, RoleMenu};
use backoffice_storage::{Filter, ListQuery, Transaction};
use tracing::{info, warn};

use crate::dao::Dao;
use crate::error::DaoError;

impl Dao<RoleMenu> {
    /// Menus bound to `role_id`, ascending.
    pub async fn menu_ids(&self, role_id: u64) -> Result<Vec<u64>, DaoError> {
        self.menu_ids_for_roles(&[role_id]).await
    }

    /// Distinct menus bound to any of `role_ids`, ascending.
    pub async fn menu_ids_for_roles(&self, role_ids: &[u64]) -> Result<Vec<u64>, DaoError> {
        if role_ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = ListQuery::all().with_filter(Filter::is_in("role_id", role_ids.iter().copied()));
        let page = self.list(&query).await?;
        let ids: BTreeSet<u64> = page.list.iter().map(|binding| binding.menu_id).collect();
        Ok(ids.into_iter().collect())
    }

    /// Replace every binding of `role_id` with `menu_ids` in one transaction.
    /// Cache entries of the removed bindings are dropped after the commit.
    pub async fn replace_for_role(&self, role_id: u64, menu_ids: &[u64]) -> Result<(), DaoError> {
        if role_id == 0 {
            return Err(DaoError::validation("role id cannot be 0"));
        }

        let mut tx = self.begin().await?;
        match self.rebind(tx.as_mut(), role_id, menu_ids).await {
            Ok(removed) => {
                tx.commit().await?;
                self.invalidate_ids(&removed).await;
                info!(role_id, menus = menu_ids.len(), "role menus replaced");
                Ok(())
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!(role_id, error = %rollback, "rollback failed");
                }
                Err(e)
            }
        }
    }

    /// Returns the ids of the deleted bindings.
    async fn rebind(
        &self,
        tx: &mut dyn Transaction,
        role_id: u64,
        menu_ids: &[u64],
    ) -> Result<Vec<u64>, DaoError> {
        let existing = self
            .store
            .find_all_by_tx(tx, "role_id", &ColumnValue::from(role_id))
            .await?;
        let removed: Vec<u64> = existing.iter().map(|binding| binding.id).collect();
        if !removed.is_empty() {
            self.store.delete_by_ids_tx(tx, &removed).await?;
        }

        let menu_ids: BTreeSet<u64> = menu_ids.iter().copied().filter(|id| *id != 0).collect();
        for menu_id in menu_ids {
            self.create_by_tx(tx, &RoleMenu::new(role_id, menu_id)).await?;
        }
        Ok(removed)
    }
}
