pub mod config;
pub mod db;
pub mod dtos;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod services;
pub mod utils;

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderName, HeaderValue, Method, StatusCode};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::middleware::{
    auth_middleware, metrics_middleware, rate_limit_middleware, RateLimitState,
};
use crate::services::{
    AuthCache, AuthService, Database, RateLimitService, SecurityAuditLogger, SessionManager,
};

pub use crate::error::AppError;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: Database,
    pub cache: Arc<dyn AuthCache>,
    pub sessions: SessionManager,
    pub auth: AuthService,
    pub audit: SecurityAuditLogger,
    pub rate_limiter: RateLimitService,
}

/// Liveness endpoint. The cache tier is reported but never fails the
/// check; the service runs durable-only when Redis is away.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = match state.db.health_check().await {
        Ok(()) => "up",
        Err(e) => {
            tracing::error!(error = %e, "Database health check failed");
            "down"
        }
    };
    let cache = if state.config.redis.url.is_none() {
        "disabled"
    } else if state.cache.health_check().await.is_ok() {
        "up"
    } else {
        "down"
    };

    let healthy = database == "up";
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(serde_json::json!({
            "status": if healthy { "ok" } else { "degraded" },
            "service": state.config.service_name,
            "checks": {
                "database": database,
                "cache": cache,
            },
        })),
    )
}

pub fn build_router(state: AppState) -> Router {
    let login_routes = Router::new()
        .route("/login", post(handlers::auth::login))
        .layer(from_fn_with_state(
            RateLimitState::new(state.rate_limiter.clone(), state.audit.clone(), "login"),
            rate_limit_middleware,
        ));

    let signup_routes = Router::new()
        .route("/signup", post(handlers::auth::signup))
        .layer(from_fn_with_state(
            RateLimitState::new(state.rate_limiter.clone(), state.audit.clone(), "signup"),
            rate_limit_middleware,
        ));

    // Rate limit wraps session auth so counting happens first.
    let verify_routes = Router::new()
        .route("/verify-password", post(handlers::auth::verify_password))
        .layer(from_fn_with_state(state.clone(), auth_middleware))
        .layer(from_fn_with_state(
            RateLimitState::new(
                state.rate_limiter.clone(),
                state.audit.clone(),
                "verify-password",
            ),
            rate_limit_middleware,
        ));

    let protected_routes = Router::new()
        .route("/token/validate", get(handlers::auth::validate_token))
        .route("/password/change", post(handlers::account::change_password))
        .layer(from_fn_with_state(state.clone(), auth_middleware));

    let cors_origins: Vec<HeaderValue> = state
        .config
        .security
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(origin = %origin, error = %e, "Skipping unparseable CORS origin");
                None
            }
        })
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(cors_origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("session-token"),
        ]);

    let trace = TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
        let request_id = request
            .headers()
            .get("x-request-id")
            .and_then(|value| value.to_str().ok())
            .unwrap_or("unknown");
        tracing::info_span!(
            "http_request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = %request_id,
        )
    });

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(handlers::metrics::metrics))
        .route("/logout", delete(handlers::auth::logout))
        .merge(login_routes)
        .merge(signup_routes)
        .merge(verify_routes)
        .merge(protected_routes)
        .with_state(state)
        .layer(from_fn(metrics_middleware))
        .layer(trace)
        .layer(cors)
}
