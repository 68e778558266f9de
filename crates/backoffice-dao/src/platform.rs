use backoffice_core::{ColumnValue, Platform};

use crate::dao::Dao;
use crate::error::DaoError;

impl Dao<Platform> {
    /// Login lookup. Always reads the store: usernames are not cache keys.
    pub async fn get_by_username(&self, username: &str) -> Result<Platform, DaoError> {
        if username.is_empty() {
            return Err(DaoError::validation("username must not be empty"));
        }
        Ok(self
            .store
            .find_one_by("username", &ColumnValue::from(username))
            .await?)
    }
}
