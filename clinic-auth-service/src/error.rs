use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::dtos::ApiResponse;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Bad request: {0}")]
    BadRequest(anyhow::Error),

    #[error("Not found: {0}")]
    NotFound(anyhow::Error),

    #[error("Authentication error: {0}")]
    AuthError(anyhow::Error),

    #[error("Account locked until {until}")]
    AccountLocked { until: DateTime<Utc> },

    #[error("Conflict: {0}")]
    Conflict(anyhow::Error),

    #[error("Too many requests: {0}")]
    TooManyRequests(String, Option<u64>),

    #[error("Database error: {0}")]
    DatabaseError(anyhow::Error),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),

    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(anyhow::Error::new(err))
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::DatabaseError(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, retry_after) = match self {
            AppError::ValidationError(err) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("Validation error: {}", err),
                None,
            ),
            AppError::BadRequest(err) => (StatusCode::BAD_REQUEST, err.to_string(), None),
            AppError::NotFound(err) => (StatusCode::NOT_FOUND, err.to_string(), None),
            AppError::AuthError(err) => (StatusCode::UNAUTHORIZED, err.to_string(), None),
            AppError::AccountLocked { until } => (
                StatusCode::UNAUTHORIZED,
                format!(
                    "Account locked until {}",
                    until.format("%Y-%m-%d %H:%M:%S UTC")
                ),
                None,
            ),
            AppError::Conflict(err) => (StatusCode::CONFLICT, err.to_string(), None),
            AppError::TooManyRequests(message, retry_after) => {
                (StatusCode::TOO_MANY_REQUESTS, message, retry_after)
            }
            AppError::DatabaseError(err) => {
                tracing::error!(error = %err, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    None,
                )
            }
            AppError::InternalError(err) => {
                tracing::error!(error = %err, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    None,
                )
            }
            AppError::ConfigError(err) => {
                tracing::error!(error = %err, "Configuration error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    None,
                )
            }
        };

        let mut response = (status, Json(ApiResponse::failure(message))).into_response();
        if let Some(seconds) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, seconds.into());
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read response body");
        serde_json::from_slice(&bytes).expect("Response body is not JSON")
    }

    #[tokio::test]
    async fn auth_error_maps_to_401_envelope() {
        let response =
            AppError::AuthError(anyhow::anyhow!("Invalid email or password")).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Invalid email or password");
        assert_eq!(body["msg"], "");
        assert!(body["data"].as_object().expect("data object").is_empty());
    }

    #[tokio::test]
    async fn account_locked_includes_unlock_time() {
        let until = chrono::Utc::now() + chrono::Duration::minutes(15);
        let response = AppError::AccountLocked { until }.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = body_json(response).await;
        let error = body["error"].as_str().expect("error string");
        assert!(error.starts_with("Account locked until "));
    }

    #[tokio::test]
    async fn too_many_requests_carries_retry_after_header() {
        let response =
            AppError::TooManyRequests("Too many requests".to_string(), Some(900)).into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok()),
            Some("900")
        );
    }

    #[tokio::test]
    async fn internal_errors_do_not_leak_details() {
        let response =
            AppError::DatabaseError(anyhow::anyhow!("connection refused on 10.0.0.3")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["error"], "Internal server error");
    }

    #[tokio::test]
    async fn conflict_maps_to_409() {
        let response = AppError::Conflict(anyhow::anyhow!("Email already registered")).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
