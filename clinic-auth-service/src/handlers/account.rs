use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::dtos::auth::ChangePasswordRequest;
use crate::dtos::ApiResponse;
use crate::error::AppError;
use crate::middleware::{AuthSession, ClientInfo};
use crate::utils::ValidatedJson;
use crate::AppState;

pub async fn change_password(
    State(state): State<AppState>,
    client: ClientInfo,
    session: AuthSession,
    ValidatedJson(req): ValidatedJson<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    let revoked = state
        .auth
        .change_password(
            session.0.account_id,
            &req.current_password,
            &req.new_password,
            &client.ip,
            &client.user_agent,
        )
        .await?;

    tracing::info!(
        account_id = session.0.account_id,
        sessions_revoked = revoked,
        "Password changed"
    );
    Ok(Json(ApiResponse::ok(
        "Password changed. All sessions have been signed out.",
        serde_json::json!({}),
    )))
}
