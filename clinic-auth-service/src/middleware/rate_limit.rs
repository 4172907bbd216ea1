use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::error::AppError;
use crate::middleware::ClientInfo;
use crate::models::SecurityEvent;
use crate::services::{metrics, RateLimitService, SecurityAuditLogger};

/// Per-route state for [`rate_limit_middleware`]. Each guarded route gets
/// its own endpoint label so windows are independent.
#[derive(Clone)]
pub struct RateLimitState {
    pub limiter: RateLimitService,
    pub audit: SecurityAuditLogger,
    pub endpoint: &'static str,
}

impl RateLimitState {
    pub fn new(
        limiter: RateLimitService,
        audit: SecurityAuditLogger,
        endpoint: &'static str,
    ) -> Self {
        Self {
            limiter,
            audit,
            endpoint,
        }
    }
}

/// Counts the request against its IP/endpoint window before the handler
/// runs. Over-limit requests answer 429 with a Retry-After hint.
pub async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let client = ClientInfo::from_request(&request);
    if client.ip.is_empty() {
        tracing::warn!(
            endpoint = state.endpoint,
            "Could not determine client IP for rate limiting"
        );
        return Ok(next.run(request).await);
    }

    if state.limiter.admit(&client.ip, state.endpoint).await {
        return Ok(next.run(request).await);
    }

    metrics::record_rate_limit_rejection(state.endpoint);
    state.audit.record(SecurityEvent::rate_limit_exceeded(
        state.endpoint,
        &client.ip,
        &client.user_agent,
    ));
    Err(AppError::TooManyRequests(
        "Too many requests. Please try again later.".to_string(),
        Some(state.limiter.window_seconds().max(0) as u64),
    ))
}
