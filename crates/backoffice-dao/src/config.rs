use backoffice_core::{Config, make_image_path};
use tracing::warn;

use crate::dao::Dao;

/// Config key holding the public base URL of uploaded images.
pub const IMAGE_DOMAIN_KEY: &str = "imageDomain";

impl Dao<Config> {
    /// Join the domain stored under `config_key` with `path`. A missing or
    /// unreadable config leaves `path` relative.
    pub async fn make_path(&self, path: &str, config_key: &str) -> String {
        let domain = match self.get_by_key(config_key).await {
            Ok(config) => config.value,
            Err(e) => {
                if !e.is_not_found() {
                    warn!(key = config_key, error = %e, "config lookup failed, using relative path");
                }
                String::new()
            }
        };
        make_image_path(&domain, path)
    }
}
