use std::sync::OnceLock;

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

static REGISTRY: OnceLock<Registry> = OnceLock::new();
static HTTP_REQUESTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
static HTTP_REQUEST_DURATION: OnceLock<HistogramVec> = OnceLock::new();
static LOGIN_ATTEMPTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
static ACCOUNT_LOCKOUTS_TOTAL: OnceLock<IntCounter> = OnceLock::new();
static RATE_LIMIT_REJECTIONS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
static SESSION_VALIDATIONS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Registers all metrics. Safe to call more than once; later calls are
/// no-ops, which keeps tests that each build an app from panicking.
pub fn init_metrics() {
    let registry = Registry::new();

    let http_requests = IntCounterVec::new(
        Opts::new("http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .expect("Failed to create http_requests_total");
    let http_duration = HistogramVec::new(
        HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request latency in seconds",
        ),
        &["method", "path"],
    )
    .expect("Failed to create http_request_duration_seconds");
    let login_attempts = IntCounterVec::new(
        Opts::new("login_attempts_total", "Login attempts by outcome"),
        &["outcome"],
    )
    .expect("Failed to create login_attempts_total");
    let lockouts = IntCounter::new("account_lockouts_total", "Accounts locked after repeated failures")
        .expect("Failed to create account_lockouts_total");
    let rate_limited = IntCounterVec::new(
        Opts::new(
            "rate_limit_rejections_total",
            "Requests rejected by the rate limiter",
        ),
        &["endpoint"],
    )
    .expect("Failed to create rate_limit_rejections_total");
    let session_validations = IntCounterVec::new(
        Opts::new(
            "session_validations_total",
            "Session validations by answering store",
        ),
        &["source"],
    )
    .expect("Failed to create session_validations_total");

    registry
        .register(Box::new(http_requests.clone()))
        .expect("Failed to register http_requests_total");
    registry
        .register(Box::new(http_duration.clone()))
        .expect("Failed to register http_request_duration_seconds");
    registry
        .register(Box::new(login_attempts.clone()))
        .expect("Failed to register login_attempts_total");
    registry
        .register(Box::new(lockouts.clone()))
        .expect("Failed to register account_lockouts_total");
    registry
        .register(Box::new(rate_limited.clone()))
        .expect("Failed to register rate_limit_rejections_total");
    registry
        .register(Box::new(session_validations.clone()))
        .expect("Failed to register session_validations_total");

    let _ = REGISTRY.set(registry);
    let _ = HTTP_REQUESTS_TOTAL.set(http_requests);
    let _ = HTTP_REQUEST_DURATION.set(http_duration);
    let _ = LOGIN_ATTEMPTS_TOTAL.set(login_attempts);
    let _ = ACCOUNT_LOCKOUTS_TOTAL.set(lockouts);
    let _ = RATE_LIMIT_REJECTIONS_TOTAL.set(rate_limited);
    let _ = SESSION_VALIDATIONS_TOTAL.set(session_validations);
}

pub fn record_http_request(method: &str, path: &str, status: u16, duration_seconds: f64) {
    if let Some(counter) = HTTP_REQUESTS_TOTAL.get() {
        counter
            .with_label_values(&[method, path, &status.to_string()])
            .inc();
    }
    if let Some(histogram) = HTTP_REQUEST_DURATION.get() {
        histogram
            .with_label_values(&[method, path])
            .observe(duration_seconds);
    }
}

pub fn record_login_attempt(outcome: &str) {
    if let Some(counter) = LOGIN_ATTEMPTS_TOTAL.get() {
        counter.with_label_values(&[outcome]).inc();
    }
}

pub fn record_account_lockout() {
    if let Some(counter) = ACCOUNT_LOCKOUTS_TOTAL.get() {
        counter.inc();
    }
}

pub fn record_rate_limit_rejection(endpoint: &str) {
    if let Some(counter) = RATE_LIMIT_REJECTIONS_TOTAL.get() {
        counter.with_label_values(&[endpoint]).inc();
    }
}

pub fn record_session_validation(source: &str) {
    if let Some(counter) = SESSION_VALIDATIONS_TOTAL.get() {
        counter.with_label_values(&[source]).inc();
    }
}

/// Renders the registry in Prometheus text exposition format.
pub fn get_metrics() -> String {
    let Some(registry) = REGISTRY.get() else {
        return String::new();
    };
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&registry.gather(), &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
