use backoffice_core::{Role, STATUS_NORMAL, SelectOption};
use backoffice_storage::{Filter, ListQuery};

use crate::dao::Dao;
use crate::error::DaoError;

impl Dao<Role> {
    /// Enabled roles ordered by `sort`, as select options.
    pub async fn options(&self) -> Result<Vec<SelectOption>, DaoError> {
        let query = ListQuery::all()
            .with_sort("sort,id")
            .with_filter(Filter::eq("status", STATUS_NORMAL));
        let page = self.list(&query).await?;
        Ok(page
            .list
            .into_iter()
            .map(|role| SelectOption::new(role.name, role.id))
            .collect())
    }

    /// Codes of the given roles in request order; unknown ids are skipped.
    pub async fn codes(&self, role_ids: &[u64]) -> Result<Vec<String>, DaoError> {
        let roles = self.get_by_ids(role_ids).await?;
        Ok(role_ids
            .iter()
            .filter_map(|id| roles.get(id))
            .map(|role| role.code.clone())
            .collect())
    }
}
