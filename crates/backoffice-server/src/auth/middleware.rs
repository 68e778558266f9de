//! Bearer-token authentication middleware.
//!
//! Verifies the access token, loads the account through the cached platform
//! DAO and attaches a [`Principal`] to the request. Tokens close to expiry
//! are renewed and the new token is returned in `X-Renewed-Token`.

use std::sync::Arc;

use axum::extract::{FromRef, Request, State};
use axum::http::{HeaderValue, header};
use axum::middleware::Next;
use axum::response::Response;
use backoffice_api::ApiError;
use backoffice_core::{Platform, Role};
use backoffice_dao::Dao;

use crate::auth::token::{TokenError, TokenService};
use crate::state::AppState;

pub const RENEWED_TOKEN_HEADER: &str = "x-renewed-token";

/// Dependencies of the auth middleware, extracted from [`AppState`].
#[derive(Clone)]
pub struct AuthState {
    pub platforms: Dao<Platform>,
    pub roles: Dao<Role>,
    pub tokens: Arc<TokenService>,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            platforms: state.daos.platform.clone(),
            roles: state.daos.role.clone(),
            tokens: state.tokens.clone(),
        }
    }
}

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: u64,
    pub role_ids: Vec<u64>,
    pub role_codes: Vec<String>,
}

fn bearer_token(req: &Request) -> Option<&str> {
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))?
        .trim();
    (!token.is_empty()).then_some(token)
}

pub async fn require_auth(
    State(auth): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&req).ok_or_else(|| ApiError::unauthorized("missing bearer token"))?;

    let claims = auth.tokens.verify(token).map_err(|e| match e {
        TokenError::Expired => ApiError::unauthorized("token has expired"),
        other => {
            tracing::debug!(error = %other, "rejected access token");
            ApiError::unauthorized("invalid token")
        }
    })?;
    let uid = claims
        .user_id()
        .map_err(|_| ApiError::unauthorized("invalid token"))?;

    let renewed = if auth.tokens.needs_renewal(&claims) {
        match auth.tokens.issue(uid) {
            Ok(token) => HeaderValue::from_str(&token).ok(),
            Err(e) => {
                tracing::warn!(uid, error = %e, "token renewal failed");
                None
            }
        }
    } else {
        None
    };

    let platform = match auth.platforms.get_by_id(uid).await {
        Ok(platform) => platform,
        Err(e) if e.is_not_found() => return Err(ApiError::unauthorized("account not found")),
        Err(e) => return Err(e.into()),
    };
    if !platform.is_normal() {
        return Err(ApiError::forbidden("account is frozen"));
    }

    let role_codes = auth.roles.codes(&platform.role_id).await?;
    req.extensions_mut().insert(Principal {
        id: platform.id,
        role_ids: platform.role_id,
        role_codes,
    });

    let mut res = next.run(req).await;
    if let Some(token) = renewed {
        res.headers_mut().insert(RENEWED_TOKEN_HEADER, token);
    }
    Ok(res)
}
