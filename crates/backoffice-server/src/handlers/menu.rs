use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use backoffice_api::{ApiError, ApiResponse};
use backoffice_core::{Menu, SelectOption};
use backoffice_dao::Route;
use backoffice_storage::{Filter, FilterOp, Page};
use serde::Deserialize;

use super::{Created, ListParams, create_row, delete_rows, get_row, keyword, list_rows, update_row};
use crate::auth::Principal;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuFilter {
    pub parent_id: Option<u64>,
    pub keywords: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionsParams {
    #[serde(default)]
    pub only_parent: bool,
}

pub async fn create(
    State(state): State<AppState>,
    Json(menu): Json<Menu>,
) -> Result<ApiResponse<Created>, ApiError> {
    if menu.name.trim().is_empty() {
        return Err(ApiError::bad_request("name is required"));
    }
    if menu.menu_type.is_none() {
        return Err(ApiError::bad_request("type is required"));
    }
    create_row(&state.daos.menu, menu).await
}

pub async fn delete(
    State(state): State<AppState>,
    Path(ids): Path<String>,
) -> Result<ApiResponse<()>, ApiError> {
    delete_rows(&state.daos.menu, &ids).await
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(patch): Json<Menu>,
) -> Result<ApiResponse<()>, ApiError> {
    if patch.parent_id == id {
        return Err(ApiError::bad_request("a menu cannot be its own parent"));
    }
    update_row(&state.daos.menu, id, patch).await
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<ApiResponse<Menu>, ApiError> {
    Ok(ApiResponse::ok(get_row(&state.daos.menu, id).await?))
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
    Query(filter): Query<MenuFilter>,
) -> Result<ApiResponse<Page<Menu>>, ApiError> {
    let mut query = params.to_query()?;
    if params.sort.is_none() {
        query = query.with_sort("sort,id");
    }
    if let Some(parent_id) = filter.parent_id {
        query = query.with_filter(Filter::eq("parent_id", parent_id));
    }
    if let Some(words) = keyword(&filter.keywords) {
        query = query.with_filter(Filter::new("name", FilterOp::Like, words));
    }
    list_rows(&state.daos.menu, &query).await
}

/// `GET /menu/routes`: navigation tree for the caller's roles.
pub async fn routes(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<ApiResponse<Vec<Route>>, ApiError> {
    Ok(ApiResponse::ok(state.daos.routes(&principal.role_ids).await?))
}

pub async fn options(
    State(state): State<AppState>,
    Query(params): Query<OptionsParams>,
) -> Result<ApiResponse<Vec<SelectOption>>, ApiError> {
    Ok(ApiResponse::ok(
        state.daos.menu.options(params.only_parent).await?,
    ))
}
