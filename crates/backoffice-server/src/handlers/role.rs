use axum::Json;
use axum::extract::{Path, Query, State};
use backoffice_api::{ApiError, ApiResponse};
use backoffice_core::{Role, SelectOption};
use backoffice_storage::{Filter, FilterOp, Page};
use serde::Deserialize;

use super::{Created, ListParams, create_row, delete_rows, get_row, keyword, list_rows, update_row};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleFilter {
    pub status: Option<i32>,
    pub keywords: Option<String>,
}

pub async fn create(
    State(state): State<AppState>,
    Json(role): Json<Role>,
) -> Result<ApiResponse<Created>, ApiError> {
    if role.name.trim().is_empty() || role.code.trim().is_empty() {
        return Err(ApiError::bad_request("name and code are required"));
    }
    create_row(&state.daos.role, role).await
}

pub async fn delete(
    State(state): State<AppState>,
    Path(ids): Path<String>,
) -> Result<ApiResponse<()>, ApiError> {
    delete_rows(&state.daos.role, &ids).await
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(patch): Json<Role>,
) -> Result<ApiResponse<()>, ApiError> {
    update_row(&state.daos.role, id, patch).await
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<ApiResponse<Role>, ApiError> {
    Ok(ApiResponse::ok(get_row(&state.daos.role, id).await?))
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
    Query(filter): Query<RoleFilter>,
) -> Result<ApiResponse<Page<Role>>, ApiError> {
    let mut query = params.to_query()?;
    if let Some(status) = filter.status {
        query = query.with_filter(Filter::eq("status", status));
    }
    if let Some(words) = keyword(&filter.keywords) {
        query = query.with_filter(Filter::new("name", FilterOp::Like, words));
    }
    list_rows(&state.daos.role, &query).await
}

pub async fn options(State(state): State<AppState>) -> Result<ApiResponse<Vec<SelectOption>>, ApiError> {
    Ok(ApiResponse::ok(state.daos.role.options().await?))
}

/// `GET /role/{id}/menuIds`
pub async fn menu_ids(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<ApiResponse<Vec<u64>>, ApiError> {
    get_row(&state.daos.role, id).await?;
    Ok(ApiResponse::ok(state.daos.role_menu.menu_ids(id).await?))
}

/// `PUT /role/{id}/menus`: replace the role's menu bindings.
pub async fn assign_menus(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(menu_ids): Json<Vec<u64>>,
) -> Result<ApiResponse<()>, ApiError> {
    get_row(&state.daos.role, id).await?;
    state.daos.role_menu.replace_for_role(id, &menu_ids).await?;
    Ok(ApiResponse::empty())
}
