//! Account management. Password hashes never leave the server: every
//! response goes through [`PlatformView`].

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use backoffice_api::{ApiError, ApiResponse};
use backoffice_core::{Platform, STATUS_NORMAL};
use backoffice_dao::IMAGE_DOMAIN_KEY;
use backoffice_storage::{Filter, FilterOp, Page};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Created, ListParams, create_row, delete_rows, get_row, keyword, list_rows, update_row};
use crate::auth::{Principal, hash_password, verify_password};
use crate::state::AppState;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PlatformForm {
    pub username: String,
    pub password: String,
    pub nickname: String,
    pub mobile: String,
    pub gender: Option<i32>,
    pub avatar: String,
    pub role_id: Vec<u64>,
    pub status: Option<i32>,
}

impl PlatformForm {
    /// Hashes the password when one is given.
    fn into_platform(self) -> Result<Platform, ApiError> {
        let password = if self.password.is_empty() {
            String::new()
        } else {
            hash(&self.password)?
        };
        Ok(Platform {
            username: self.username.trim().to_string(),
            password,
            nickname: self.nickname,
            mobile: self.mobile,
            gender: self.gender,
            avatar: self.avatar,
            role_id: self.role_id,
            status: self.status,
            ..Default::default()
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProfileForm {
    pub nickname: String,
    pub mobile: String,
    pub gender: Option<i32>,
    pub avatar: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordForm {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordForm {
    pub id: u64,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformFilter {
    pub username: Option<String>,
    pub status: Option<i32>,
}

/// A platform account without its password hash.
#[derive(Debug, Clone, Serialize)]
pub struct PlatformView {
    pub id: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub username: String,
    pub nickname: String,
    pub mobile: String,
    pub gender: Option<i32>,
    pub avatar: String,
    pub role_id: Vec<u64>,
    pub status: Option<i32>,
    pub last_time: Option<DateTime<Utc>>,
}

impl From<Platform> for PlatformView {
    fn from(p: Platform) -> Self {
        Self {
            id: p.id,
            created_at: p.created_at,
            updated_at: p.updated_at,
            username: p.username,
            nickname: p.nickname,
            mobile: p.mobile,
            gender: p.gender,
            avatar: p.avatar,
            role_id: p.role_id,
            status: p.status,
            last_time: p.last_time,
        }
    }
}

/// `GET /platform/me`
#[derive(Debug, Serialize)]
pub struct MeView {
    #[serde(flatten)]
    pub platform: PlatformView,
    pub roles: Vec<String>,
    pub perms: Vec<String>,
}

/// `GET /platform/profile`: role codes joined with commas.
#[derive(Debug, Serialize)]
pub struct ProfileView {
    #[serde(flatten)]
    pub platform: PlatformView,
    pub roles: String,
}

fn hash(password: &str) -> Result<String, ApiError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    hash_password(password).map_err(|e| {
        tracing::error!(error = %e, "password hashing failed");
        ApiError::internal("internal server error")
    })
}

pub async fn create(
    State(state): State<AppState>,
    Json(form): Json<PlatformForm>,
) -> Result<ApiResponse<Created>, ApiError> {
    if form.username.trim().is_empty() || form.password.is_empty() {
        return Err(ApiError::bad_request("username and password are required"));
    }
    let mut platform = form.into_platform()?;
    platform.status = platform.status.or(Some(STATUS_NORMAL));
    create_row(&state.daos.platform, platform).await
}

pub async fn delete(
    State(state): State<AppState>,
    Path(ids): Path<String>,
) -> Result<ApiResponse<()>, ApiError> {
    delete_rows(&state.daos.platform, &ids).await
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(form): Json<PlatformForm>,
) -> Result<ApiResponse<()>, ApiError> {
    update_row(&state.daos.platform, id, form.into_platform()?).await
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<ApiResponse<PlatformView>, ApiError> {
    Ok(ApiResponse::ok(get_row(&state.daos.platform, id).await?.into()))
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
    Query(filter): Query<PlatformFilter>,
) -> Result<ApiResponse<Page<PlatformView>>, ApiError> {
    let mut query = params.to_query()?;
    if let Some(username) = keyword(&filter.username) {
        query = query.with_filter(Filter::new("username", FilterOp::Like, username));
    }
    if let Some(status) = filter.status {
        query = query.with_filter(Filter::eq("status", status));
    }
    let page = list_rows(&state.daos.platform, &query).await?;
    Ok(ApiResponse::ok(page.value.map(PlatformView::from)))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<ApiResponse<MeView>, ApiError> {
    let mut platform = state.daos.platform.get_by_id(principal.id).await?;
    platform.avatar = state
        .daos
        .config
        .make_path(&platform.avatar, IMAGE_DOMAIN_KEY)
        .await;
    let perms = state.daos.role_permissions(&principal.role_ids).await?;
    Ok(ApiResponse::ok(MeView {
        platform: platform.into(),
        roles: principal.role_codes,
        perms,
    }))
}

pub async fn profile(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<ApiResponse<ProfileView>, ApiError> {
    let platform = state.daos.platform.get_by_id(principal.id).await?;
    Ok(ApiResponse::ok(ProfileView {
        platform: platform.into(),
        roles: principal.role_codes.join(","),
    }))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(form): Json<ProfileForm>,
) -> Result<ApiResponse<()>, ApiError> {
    let patch = Platform {
        nickname: form.nickname,
        mobile: form.mobile,
        gender: form.gender,
        avatar: form.avatar,
        ..Default::default()
    };
    update_row(&state.daos.platform, principal.id, patch).await
}

pub async fn change_password(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(form): Json<ChangePasswordForm>,
) -> Result<ApiResponse<()>, ApiError> {
    let platform = state.daos.platform.get_by_id(principal.id).await?;
    let matches = verify_password(&form.old_password, &platform.password).unwrap_or(false);
    if !matches {
        return Err(ApiError::bad_request("old password is incorrect"));
    }
    let patch = Platform {
        password: hash(&form.new_password)?,
        ..Default::default()
    };
    update_row(&state.daos.platform, principal.id, patch).await
}

pub async fn reset_password(
    State(state): State<AppState>,
    Json(form): Json<ResetPasswordForm>,
) -> Result<ApiResponse<()>, ApiError> {
    get_row(&state.daos.platform, form.id).await?;
    let patch = Platform {
        password: hash(&form.password)?,
        ..Default::default()
    };
    update_row(&state.daos.platform, form.id, patch).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_drops_password() {
        let view = PlatformView::from(Platform {
            id: 1,
            username: "admin".into(),
            password: "$argon2id$secret".into(),
            ..Default::default()
        });
        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["username"], "admin");
    }

    #[test]
    fn test_form_hashes_password() {
        let form = PlatformForm {
            username: " alice ".into(),
            password: "hunter22".into(),
            ..Default::default()
        };
        let platform = form.into_platform().unwrap();
        assert_eq!(platform.username, "alice");
        assert!(verify_password("hunter22", &platform.password).unwrap());
    }

    #[test]
    fn test_short_password_rejected() {
        let form = PlatformForm {
            username: "bob".into(),
            password: "123".into(),
            ..Default::default()
        };
        assert!(form.into_platform().is_err());
    }

    #[test]
    fn test_form_without_password_is_sparse() {
        let platform = PlatformForm {
            nickname: "Bob".into(),
            ..Default::default()
        }
        .into_platform()
        .unwrap();
        assert!(platform.password.is_empty());
    }
}
