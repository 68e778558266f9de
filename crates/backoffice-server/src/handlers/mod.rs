//! HTTP handlers.
//!
//! Every handler returns [`ApiResponse`] or [`ApiError`], both rendered as
//! the `{code, msg, data}` envelope. List endpoints take the shared
//! [`ListParams`] plus an entity-specific filter struct.

pub mod auth;
pub mod config;
pub mod menu;
pub mod platform;
pub mod role;
pub mod role_menu;
pub mod upload;

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use backoffice_api::{ApiError, ApiResponse, parse_ids};
use backoffice_core::Entity;
use backoffice_dao::Dao;
use backoffice_storage::{Filter, FilterOp, ListQuery, Page};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::metrics::render_metrics;

const DEFAULT_PAGE_SIZE: u32 = 20;

/// Pagination, sorting and creation-time window shared by every list
/// endpoint. `page` is 1-based on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub sort: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

impl ListParams {
    pub fn to_query(&self) -> Result<ListQuery, ApiError> {
        let page = self.page.unwrap_or(1).saturating_sub(1);
        let page_size = self.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        let mut query = ListQuery::new()
            .with_page(page, page_size)
            .with_sort(self.sort.clone().unwrap_or_default());

        let start = self.start_time.as_deref().map(parse_time).transpose()?;
        let end = self.end_time.as_deref().map(parse_time).transpose()?;
        match (start, end) {
            (Some(start), Some(end)) => {
                if start > end {
                    return Err(ApiError::bad_request("startTime is after endTime"));
                }
                query = query.with_created_between(start, end);
            }
            (Some(start), None) => {
                query = query.with_filter(Filter::new("created_at", FilterOp::Gte, start));
            }
            (None, Some(end)) => {
                query = query.with_filter(Filter::new("created_at", FilterOp::Lte, end));
            }
            (None, None) => {}
        }
        Ok(query)
    }
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS` (UTC) or a bare date (midnight UTC).
pub fn parse_time(raw: &str) -> Result<DateTime<Utc>, ApiError> {
    let raw = raw.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Ok(t.with_timezone(&Utc));
    }
    if let Ok(t) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(t.and_utc());
    }
    if let Some(t) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(t.and_utc());
    }
    Err(ApiError::bad_request(format!("invalid time '{raw}'")))
}

/// Body of a successful create.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Created {
    pub id: u64,
}

/// Trim a keyword filter, `None` when blank.
pub(crate) fn keyword(raw: &Option<String>) -> Option<&str> {
    raw.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

pub(crate) async fn create_row<E: Entity>(
    dao: &Dao<E>,
    mut record: E,
) -> Result<ApiResponse<Created>, ApiError> {
    record.set_id(0);
    let row = dao.create(&record).await?;
    Ok(ApiResponse::ok(Created { id: row.id() }))
}

pub(crate) async fn get_row<E: Entity>(dao: &Dao<E>, id: u64) -> Result<E, ApiError> {
    if id == 0 {
        return Err(ApiError::bad_request("id cannot be 0"));
    }
    Ok(dao.get_by_id(id).await?)
}

/// Sparse update: zero-valued fields of `patch` are left untouched.
pub(crate) async fn update_row<E: Entity>(
    dao: &Dao<E>,
    id: u64,
    mut patch: E,
) -> Result<ApiResponse<()>, ApiError> {
    if id == 0 {
        return Err(ApiError::bad_request("id cannot be 0"));
    }
    patch.set_id(id);
    dao.update_by_id(&patch).await?;
    Ok(ApiResponse::empty())
}

pub(crate) async fn delete_rows<E: Entity>(
    dao: &Dao<E>,
    raw_ids: &str,
) -> Result<ApiResponse<()>, ApiError> {
    let ids = parse_ids(raw_ids)?;
    dao.delete_by_ids(&ids).await?;
    Ok(ApiResponse::empty())
}

pub(crate) async fn list_rows<E: Entity>(
    dao: &Dao<E>,
    query: &ListQuery,
) -> Result<ApiResponse<Page<E>>, ApiError> {
    Ok(ApiResponse::ok(dao.list(query).await?))
}

pub async fn health() -> ApiResponse<&'static str> {
    ApiResponse::ok("ok")
}

pub async fn metrics() -> Response {
    match render_metrics() {
        Some(body) => (
            StatusCode::OK,
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; version=0.0.4"),
            )],
            body,
        )
            .into_response(),
        None => ApiError::internal("metrics recorder not installed").into_response(),
    }
}
