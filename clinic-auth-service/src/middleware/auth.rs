use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;

use crate::error::AppError;
use crate::middleware::ClientInfo;
use crate::models::SecurityEvent;
use crate::AppState;

pub const SESSION_TOKEN_HEADER: &str = "session-token";

/// Identity attached to the request once its session token validated.
#[derive(Debug, Clone)]
pub struct SessionIdentity {
    pub account_id: i64,
    pub role: String,
    pub token: String,
}

/// Validates the session-token header and stores the resolved identity in
/// request extensions. Rejections are recorded as UNAUTHORIZED_ACCESS.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let client = ClientInfo::from_request(&request);
    let path = request.uri().path().to_string();

    let token = request
        .headers()
        .get(SESSION_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    let Some(token) = token else {
        state.audit.record(SecurityEvent::unauthorized_access(
            &client.ip,
            &client.user_agent,
            &format!("Missing session token on {}", path),
        ));
        return Err(AppError::AuthError(anyhow::anyhow!(
            "Missing session-token header"
        )));
    };

    match state.sessions.validate(&token).await {
        Ok((account_id, role)) => {
            request.extensions_mut().insert(SessionIdentity {
                account_id,
                role,
                token,
            });
            Ok(next.run(request).await)
        }
        Err(e) => {
            if matches!(e, AppError::AuthError(_)) {
                state.audit.record(SecurityEvent::unauthorized_access(
                    &client.ip,
                    &client.user_agent,
                    &format!("Invalid session token on {}", path),
                ));
            }
            Err(e)
        }
    }
}

/// Extractor for handlers behind [`auth_middleware`].
pub struct AuthSession(pub SessionIdentity);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthSession
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let identity = parts
            .extensions
            .get::<SessionIdentity>()
            .cloned()
            .ok_or_else(|| {
                AppError::InternalError(anyhow::anyhow!(
                    "Session identity missing from request extensions"
                ))
            })?;
        Ok(AuthSession(identity))
    }
}
