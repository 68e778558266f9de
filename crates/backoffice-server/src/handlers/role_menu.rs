use axum::Json;
use axum::extract::{Path, Query, State};
use backoffice_api::{ApiError, ApiResponse};
use backoffice_core::RoleMenu;
use backoffice_storage::{Filter, Page};
use serde::Deserialize;

use super::{Created, ListParams, create_row, delete_rows, get_row, list_rows, update_row};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleMenuFilter {
    pub role_id: Option<u64>,
    pub menu_id: Option<u64>,
}

pub async fn create(
    State(state): State<AppState>,
    Json(binding): Json<RoleMenu>,
) -> Result<ApiResponse<Created>, ApiError> {
    if binding.role_id == 0 || binding.menu_id == 0 {
        return Err(ApiError::bad_request("role_id and menu_id are required"));
    }
    create_row(&state.daos.role_menu, binding).await
}

pub async fn delete(
    State(state): State<AppState>,
    Path(ids): Path<String>,
) -> Result<ApiResponse<()>, ApiError> {
    delete_rows(&state.daos.role_menu, &ids).await
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(patch): Json<RoleMenu>,
) -> Result<ApiResponse<()>, ApiError> {
    update_row(&state.daos.role_menu, id, patch).await
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<ApiResponse<RoleMenu>, ApiError> {
    Ok(ApiResponse::ok(get_row(&state.daos.role_menu, id).await?))
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
    Query(filter): Query<RoleMenuFilter>,
) -> Result<ApiResponse<Page<RoleMenu>>, ApiError> {
    let mut query = params.to_query()?;
    if let Some(role_id) = filter.role_id {
        query = query.with_filter(Filter::eq("role_id", role_id));
    }
    if let Some(menu_id) = filter.menu_id {
        query = query.with_filter(Filter::eq("menu_id", menu_id));
    }
    list_rows(&state.daos.role_menu, &query).await
}
