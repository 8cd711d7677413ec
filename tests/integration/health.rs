//! Health and metrics endpoint tests

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use llm_relay::{provider::scripted::Script, routes, ConfiguredCredentials, FailureInfo};

use crate::common::{constants::CHAT_PATH, scripted_app, scripted_app_with_credentials, test_data};

#[tokio::test]
async fn test_health_is_degraded_with_partial_credentials() {
    let app = scripted_app(Script::Complete(json!({})));

    let response = app.server.get("/health").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["completion_provider"], "scripted");
    assert_eq!(body["configured_providers"], json!(["OPEN_AI", "ANTHROPIC"]));
    assert!(body["uptime_seconds"].is_u64());
}

#[tokio::test]
async fn test_health_is_unhealthy_without_credentials() {
    let app = scripted_app_with_credentials(
        Script::Complete(json!({})),
        ConfiguredCredentials::new(),
    );

    let response = app.server.get("/health").await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.json::<Value>()["status"], "unhealthy");
}

#[tokio::test]
async fn test_readiness() {
    let ready = scripted_app(Script::Complete(json!({})));
    let response = ready.server.get("/health/ready").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>(), json!({"status": "healthy"}));

    let not_ready = scripted_app_with_credentials(
        Script::Complete(json!({})),
        ConfiguredCredentials::new(),
    );
    not_ready
        .server
        .get("/health/ready")
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_liveness() {
    let app = scripted_app_with_credentials(
        Script::Complete(json!({})),
        ConfiguredCredentials::new(),
    );

    let response = app.server.get("/health/live").await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>(), json!({"status": "healthy"}));
}

#[tokio::test]
async fn test_metrics_endpoint_reports_requests() {
    routes::metrics::init_metrics();
    let app = scripted_app(Script::Complete(json!({"ok": true})));

    app.server
        .post(CHAT_PATH)
        .json(&test_data::buffered_request())
        .await
        .assert_status_ok();
    app.server
        .post(CHAT_PATH)
        .json(&json!({"messages": []}))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    // Outcome metrics are recorded by the execution task after the body closes.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let response = app.server.get("/metrics").await;
    response.assert_status_ok();

    let text = response.text();
    assert!(text.contains("relay_rejections_total"));
    assert!(text.contains("relay_requests_total"));
}

#[tokio::test]
async fn test_metrics_record_provider_failure_outcome() {
    routes::metrics::init_metrics();
    let app = scripted_app(Script::Fail(FailureInfo::new("boom").with_status(502)));

    app.server
        .post(CHAT_PATH)
        .json(&test_data::buffered_request())
        .await
        .assert_status_ok();

    let text = app.server.get("/metrics").await.text();
    assert!(
        text.contains("outcome=\"provider_failure\""),
        "missing provider_failure outcome in:\n{}",
        text
    );
}
