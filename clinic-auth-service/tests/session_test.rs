mod common;

use axum::http::StatusCode;
use clinic_auth_service::services::AuthCache;
use common::*;
use tower::util::ServiceExt;

#[tokio::test]
async fn cached_session_validates_without_touching_the_database() {
    let (app, cache, _state) = spawn_app();

    // Seed the mirror directly; the durable store behind this app is
    // unreachable, so a pass proves the cache answered.
    let payload = serde_json::json!({"account_id": 7, "role": "therapist"}).to_string();
    cache
        .set("session:tok-cache-hit", &payload, 600)
        .await
        .unwrap();

    let response = app
        .oneshot(request_with_token("GET", "/token/validate", "tok-cache-hit"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["msg"], "Token is valid");
    assert_eq!(body["data"]["user_id"], 7);
    assert_eq!(body["data"]["role"], "therapist");
}

#[tokio::test]
async fn missing_session_token_answers_401() {
    let (app, _cache, _state) = spawn_app();

    let response = app
        .oneshot(empty_request("GET", "/token/validate"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = response_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Missing session-token header");
    assert_eq!(body["msg"], "");
}

#[tokio::test]
async fn logout_without_token_answers_401() {
    let (app, _cache, _state) = spawn_app();

    let response = app.oneshot(empty_request("DELETE", "/logout")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn error_envelope_has_exactly_the_four_fields() {
    let (app, _cache, _state) = spawn_app();

    let response = app
        .oneshot(empty_request("GET", "/token/validate"))
        .await
        .unwrap();
    let body = response_json(response).await;

    let object = body.as_object().expect("envelope object");
    assert_eq!(object.len(), 4);
    assert!(object.contains_key("success"));
    assert!(object.contains_key("error"));
    assert!(object.contains_key("msg"));
    assert!(object.contains_key("data"));
}

#[tokio::test]
async fn health_reports_degraded_when_the_database_is_down() {
    let (app, _cache, _state) = spawn_app();

    let response = app.oneshot(empty_request("GET", "/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body = response_json(response).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["checks"]["database"], "down");
    // No REDIS_URL in the test config, so the tier reads as absent.
    assert_eq!(body["checks"]["cache"], "disabled");
}

#[tokio::test]
async fn metrics_endpoint_renders_request_counters() {
    clinic_auth_service::services::metrics::init_metrics();
    let (app, _cache, _state) = spawn_app();

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/health"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let response = app.oneshot(empty_request("GET", "/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("http_requests_total"));
    assert!(text.contains("/health"));
}
