use axum::response::IntoResponse;

use crate::services::metrics;

/// Prometheus scrape endpoint.
pub async fn metrics() -> impl IntoResponse {
    metrics::get_metrics()
}
