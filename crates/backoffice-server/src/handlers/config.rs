use std::collections::BTreeMap;

use axum::Json;
use axum::extract::{Path, Query, State};
use backoffice_api::{ApiError, ApiResponse};
use backoffice_core::{Config, SelectOption};
use backoffice_storage::{Filter, FilterOp, Page};
use serde::Deserialize;

use super::{Created, ListParams, create_row, delete_rows, get_row, keyword, list_rows, update_row};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFilter {
    pub key: Option<String>,
    pub keywords: Option<String>,
}

pub async fn create(
    State(state): State<AppState>,
    Json(config): Json<Config>,
) -> Result<ApiResponse<Created>, ApiError> {
    if config.key.trim().is_empty() {
        return Err(ApiError::bad_request("key is required"));
    }
    create_row(&state.daos.config, config).await
}

pub async fn delete(
    State(state): State<AppState>,
    Path(ids): Path<String>,
) -> Result<ApiResponse<()>, ApiError> {
    delete_rows(&state.daos.config, &ids).await
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(patch): Json<Config>,
) -> Result<ApiResponse<()>, ApiError> {
    update_row(&state.daos.config, id, patch).await
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<ApiResponse<Config>, ApiError> {
    Ok(ApiResponse::ok(get_row(&state.daos.config, id).await?))
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
    Query(filter): Query<ConfigFilter>,
) -> Result<ApiResponse<Page<Config>>, ApiError> {
    let mut query = params.to_query()?;
    if let Some(key) = keyword(&filter.key) {
        query = query.with_filter(Filter::eq("key", key));
    }
    if let Some(words) = keyword(&filter.keywords) {
        query = query.with_filter(Filter::new("name", FilterOp::Like, words));
    }
    list_rows(&state.daos.config, &query).await
}

/// `GET /config/dict`: every static enum dictionary.
pub async fn dict(State(state): State<AppState>) -> ApiResponse<BTreeMap<String, Vec<SelectOption>>> {
    ApiResponse::ok(state.enums.all().clone())
}
