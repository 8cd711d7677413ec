//! Prometheus metrics endpoint
//!
//! Exposes application metrics in Prometheus format for monitoring.

use axum::response::IntoResponse;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;

/// Global Prometheus handle for metrics export
static PROMETHEUS_HANDLE: Lazy<PrometheusHandle> = Lazy::new(|| {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
});

/// Initialize metrics (call once at startup)
pub fn init_metrics() {
    // Force initialization of the lazy static
    let _ = &*PROMETHEUS_HANDLE;

    register_metrics();
}

fn register_metrics() {
    metrics::describe_counter!(
        "relay_requests_total",
        "Chat requests that reached a provider, by mode and outcome"
    );
    metrics::describe_histogram!(
        "relay_request_duration_seconds",
        "Time from request receipt to terminal frame"
    );
    metrics::describe_counter!(
        "relay_stream_chunks_total",
        "Chunk events relayed on streamed responses"
    );
    metrics::describe_counter!(
        "relay_rejections_total",
        "Requests refused before any provider call"
    );
}

/// Prometheus metrics endpoint handler
///
/// Returns metrics in Prometheus text format for scraping.
pub async fn prometheus_metrics() -> impl IntoResponse {
    PROMETHEUS_HANDLE.render()
}

/// Record a request that reached its terminal outcome
pub fn record_request(mode: &str, provider: &str, outcome: &str, duration_secs: f64) {
    metrics::counter!(
        "relay_requests_total",
        "mode" => mode.to_string(),
        "provider" => provider.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
    metrics::histogram!(
        "relay_request_duration_seconds",
        "mode" => mode.to_string(),
        "provider" => provider.to_string()
    )
    .record(duration_secs);
}

/// Record chunks relayed on one streamed response
pub fn record_stream_chunks(provider: &str, count: u64) {
    metrics::counter!("relay_stream_chunks_total", "provider" => provider.to_string())
        .increment(count);
}

/// Record a validation rejection
pub fn record_rejection(reason: &str) {
    metrics::counter!("relay_rejections_total", "reason" => reason.to_string()).increment(1);
}
