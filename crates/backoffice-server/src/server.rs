use std::net::SocketAddr;

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post, put};
use axum::{Router, middleware};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::auth::require_auth;
use crate::config::AppConfig;
use crate::handlers::{self, auth, config, menu, platform, role, role_menu, upload};
use crate::middleware as app_middleware;
use crate::state::AppState;

pub const API_PREFIX: &str = "/api/v1";

pub struct BackofficeServer {
    addr: SocketAddr,
    app: Router,
}

fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/logout", delete(auth::logout))
        // config
        .route("/config", get(config::list).post(config::create))
        .route("/config/dict", get(config::dict))
        .route(
            "/config/{id}",
            get(config::get).put(config::update).delete(config::delete),
        )
        // menu
        .route("/menu", get(menu::list).post(menu::create))
        .route("/menu/routes", get(menu::routes))
        .route("/menu/options", get(menu::options))
        .route(
            "/menu/{id}",
            get(menu::get).put(menu::update).delete(menu::delete),
        )
        // platform
        .route("/platform", get(platform::list).post(platform::create))
        .route("/platform/me", get(platform::me))
        .route(
            "/platform/profile",
            get(platform::profile).put(platform::update_profile),
        )
        .route("/platform/password", put(platform::change_password))
        .route("/platform/password/reset", put(platform::reset_password))
        .route(
            "/platform/{id}",
            get(platform::get)
                .put(platform::update)
                .delete(platform::delete),
        )
        // role
        .route("/role", get(role::list).post(role::create))
        .route("/role/options", get(role::options))
        .route("/role/{id}/menuIds", get(role::menu_ids))
        .route("/role/{id}/menus", put(role::assign_menus))
        .route(
            "/role/{id}",
            get(role::get).put(role::update).delete(role::delete),
        )
        // roleMenu
        .route("/roleMenu", get(role_menu::list).post(role_menu::create))
        .route(
            "/roleMenu/{id}",
            get(role_menu::get)
                .put(role_menu::update)
                .delete(role_menu::delete),
        )
        .route("/upload/local", post(upload::local))
}

pub fn build_app(state: AppState, cfg: &AppConfig) -> Router {
    let body_limit = cfg.server.body_limit_bytes;

    let api = protected_routes()
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .route("/auth/login", post(auth::login));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .nest(API_PREFIX, api)
        .with_state(state)
        // outermost last: request id -> metrics -> trace -> cors/compression -> body limit
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &axum::http::Request<_>| {
                let req_id = req
                    .extensions()
                    .get::<axum::http::HeaderValue>()
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("")
                    .to_string();
                tracing::info_span!(
                    "http.request",
                    http.method = %req.method(),
                    http.target = %req.uri(),
                    request_id = %req_id
                )
            }),
        )
        .layer(middleware::from_fn(app_middleware::http_metrics))
        .layer(middleware::from_fn(app_middleware::request_id))
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
    state: AppState,
}

impl ServerBuilder {
    pub fn new(config: AppConfig, state: AppState) -> Self {
        Self {
            addr: config.addr(),
            config,
            state,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn build(self) -> BackofficeServer {
        BackofficeServer {
            addr: self.addr,
            app: build_app(self.state, &self.config),
        }
    }
}

impl BackofficeServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
