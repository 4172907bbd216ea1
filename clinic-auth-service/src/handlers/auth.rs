use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;

use crate::dtos::auth::{
    LoginRequest, SignupRequest, TokenValidation, VerifyPasswordRequest,
};
use crate::dtos::ApiResponse;
use crate::error::AppError;
use crate::middleware::{AuthSession, ClientInfo, SESSION_TOKEN_HEADER};
use crate::utils::ValidatedJson;
use crate::AppState;

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    client: ClientInfo,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let grant = state
        .auth
        .login(req, &client.ip, &client.user_agent)
        .await?;
    Ok((
        StatusCode::OK,
        Json(ApiResponse::ok("Login successful", grant)),
    ))
}

#[axum::debug_handler]
pub async fn signup(
    State(state): State<AppState>,
    client: ClientInfo,
    ValidatedJson(req): ValidatedJson<SignupRequest>,
) -> Result<impl IntoResponse, AppError> {
    let grant = state
        .auth
        .signup(req, &client.ip, &client.user_agent)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Account created", grant)),
    ))
}

/// Revokes the presented session. Deliberately not behind the auth
/// middleware: revocation itself decides whether the token names a live
/// row, so an expired-but-unrevoked session can still be logged out.
pub async fn logout(
    State(state): State<AppState>,
    client: ClientInfo,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let token = headers
        .get(SESSION_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::AuthError(anyhow::anyhow!("Missing session-token header")))?;

    state
        .auth
        .logout(token, &client.ip, &client.user_agent)
        .await?;
    Ok(Json(ApiResponse::ok(
        "Logged out successfully",
        serde_json::json!({}),
    )))
}

/// Answers from the identity the auth middleware resolved.
pub async fn validate_token(session: AuthSession) -> impl IntoResponse {
    Json(ApiResponse::ok(
        "Token is valid",
        TokenValidation {
            user_id: session.0.account_id,
            role: session.0.role,
        },
    ))
}

pub async fn verify_password(
    State(state): State<AppState>,
    session: AuthSession,
    ValidatedJson(req): ValidatedJson<VerifyPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .auth
        .verify_password(session.0.account_id, &req.password)
        .await?;
    Ok(Json(ApiResponse::ok(
        "Password verified",
        serde_json::json!({}),
    )))
}
