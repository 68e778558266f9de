use axum::Json;
use axum::extract::State;
use backoffice_api::{ApiError, ApiResponse};
use backoffice_core::Platform;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::verify_password;
use crate::state::AppState;

const BAD_CREDENTIALS: &str = "invalid username or password";

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub expires: u64,
    pub token_type: &'static str,
}

/// `POST /auth/login`. Unknown user and wrong password look the same.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<ApiResponse<LoginResponse>, ApiError> {
    if req.username.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::bad_request("username and password are required"));
    }

    let platform = match state.daos.platform.get_by_username(req.username.trim()).await {
        Ok(platform) => platform,
        Err(e) if e.is_not_found() => return Err(ApiError::unauthorized(BAD_CREDENTIALS)),
        Err(e) => return Err(e.into()),
    };

    match verify_password(&req.password, &platform.password) {
        Ok(true) => {}
        Ok(false) => return Err(ApiError::unauthorized(BAD_CREDENTIALS)),
        Err(e) => {
            warn!(uid = platform.id, error = %e, "stored password hash is malformed");
            return Err(ApiError::unauthorized(BAD_CREDENTIALS));
        }
    }
    if !platform.is_normal() {
        return Err(ApiError::forbidden("account is frozen"));
    }

    let token = state
        .tokens
        .issue(platform.id)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    let touch = Platform {
        id: platform.id,
        last_time: Some(Utc::now()),
        ..Default::default()
    };
    if let Err(e) = state.daos.platform.update_by_id(&touch).await {
        warn!(uid = platform.id, error = %e, "failed to record login time");
    }

    info!(uid = platform.id, "login");
    Ok(ApiResponse::ok(LoginResponse {
        access_token: token,
        expires: state.tokens.ttl().as_secs(),
        token_type: "Bearer",
    }))
}

/// `DELETE /auth/logout`. Tokens are stateless, the client drops its copy.
pub async fn logout() -> ApiResponse<()> {
    ApiResponse::empty()
}
