use std::sync::Arc;

use backoffice_core::EnumRegistry;
use backoffice_dao::Daos;

use crate::auth::TokenService;
use crate::config::UploadConfig;

/// Shared handler state. Cheap to clone: every field is a handle.
#[derive(Clone)]
pub struct AppState {
    pub daos: Daos,
    pub enums: Arc<EnumRegistry>,
    pub tokens: Arc<TokenService>,
    pub upload: Arc<UploadConfig>,
}
