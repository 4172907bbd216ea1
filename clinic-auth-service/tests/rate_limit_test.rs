mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use clinic_auth_service::services::{AuthCache, DisabledCache, FailingCache};
use common::*;
use tower::util::ServiceExt;

fn login_body() -> serde_json::Value {
    serde_json::json!({"email": "pat@example.com", "password": "wrong-password"})
}

#[tokio::test]
async fn sixth_login_attempt_in_the_window_is_rejected() {
    let (app, _cache, _state) = spawn_app();

    // The first five reach the handler; with no database behind this app
    // they fail for other reasons, but never with 429.
    for attempt in 1..=5 {
        let response = app
            .clone()
            .oneshot(json_request("POST", "/login", login_body()))
            .await
            .unwrap();
        assert_ne!(
            response.status(),
            StatusCode::TOO_MANY_REQUESTS,
            "attempt {} should not be rate limited",
            attempt
        );
    }

    let response = app
        .oneshot(json_request("POST", "/login", login_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        response
            .headers()
            .get("retry-after")
            .and_then(|value| value.to_str().ok()),
        Some("900")
    );

    let body = response_json(response).await;
    assert_eq!(body["success"], false);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("Too many requests"));
}

#[tokio::test]
async fn windows_are_tracked_per_client_ip() {
    let (app, _cache, _state) = spawn_app();

    for _ in 0..6 {
        let _ = app
            .clone()
            .oneshot(json_request_from_ip("POST", "/login", login_body(), "203.0.113.5"))
            .await
            .unwrap();
    }

    let response = app
        .oneshot(json_request_from_ip("POST", "/login", login_body(), "203.0.113.6"))
        .await
        .unwrap();
    assert_ne!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn windows_are_tracked_per_endpoint() {
    let (app, _cache, _state) = spawn_app();

    for _ in 0..6 {
        let _ = app
            .clone()
            .oneshot(json_request("POST", "/login", login_body()))
            .await
            .unwrap();
    }

    // Same IP, different endpoint: its window is untouched.
    let signup = serde_json::json!({
        "name": "Pat",
        "email": "pat@example.com",
        "password": "long enough password"
    });
    let response = app
        .oneshot(json_request("POST", "/signup", signup))
        .await
        .unwrap();
    assert_ne!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn limiter_fails_open_when_the_counter_store_errors() {
    let (app, _cache, _state) = spawn_app_with_cache(Arc::new(FailingCache));

    for _ in 0..10 {
        let response = app
            .clone()
            .oneshot(json_request("POST", "/login", login_body()))
            .await
            .unwrap();
        assert_ne!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}

#[tokio::test]
async fn limiter_admits_everything_without_a_cache_tier() {
    let (app, _cache, _state) = spawn_app_with_cache(Arc::new(DisabledCache));

    for _ in 0..10 {
        let response = app
            .clone()
            .oneshot(json_request("POST", "/login", login_body()))
            .await
            .unwrap();
        assert_ne!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}

#[tokio::test]
async fn rate_limited_request_never_reaches_credential_checking() {
    let (app, cache, _state) = spawn_app();

    for _ in 0..6 {
        let _ = app
            .clone()
            .oneshot(json_request("POST", "/login", login_body()))
            .await
            .unwrap();
    }

    // Counter sits at the limiter key; one more denied request still
    // increments it, proving the middleware saw the request.
    let before = cache
        .get("ratelimit:127.0.0.1:login")
        .await
        .unwrap()
        .unwrap()
        .parse::<i64>()
        .unwrap();
    let response = app
        .oneshot(json_request("POST", "/login", login_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    let after = cache
        .get("ratelimit:127.0.0.1:login")
        .await
        .unwrap()
        .unwrap()
        .parse::<i64>()
        .unwrap();
    assert_eq!(after, before + 1);
}
