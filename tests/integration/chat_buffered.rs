//! Buffered chat completion tests
//!
//! Requests whose `stream` field is absent or false get exactly one JSON
//! document: the provider's raw result, or a normalized error.

use axum::http::{header, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use llm_relay::{provider::scripted::Script, FailureInfo, Provider};

use crate::common::{constants::CHAT_PATH, scripted_app, test_data};

#[tokio::test]
async fn test_buffered_success_returns_raw_result() {
    let app = scripted_app(Script::Complete(test_data::completion_result()));

    let response = app
        .server
        .post(CHAT_PATH)
        .json(&test_data::buffered_request())
        .await;

    response.assert_status_ok();
    assert_eq!(response.header(header::CONTENT_TYPE), "application/json");
    assert_eq!(response.json::<Value>(), test_data::completion_result());
}

#[tokio::test]
async fn test_absent_stream_field_is_buffered() {
    let app = scripted_app(Script::Complete(json!({"ok": true})));

    let response = app
        .server
        .post(CHAT_PATH)
        .json(&json!({
            "messages": [{"role": "user", "content": "hi"}],
            "model": "gpt-4",
            "provider": "OPEN_AI"
        }))
        .await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>(), json!({"ok": true}));
    assert!(!app.provider.calls()[0].stream);
}

#[tokio::test]
async fn test_string_false_is_buffered() {
    let app = scripted_app(Script::Complete(json!({"ok": true})));

    let response = app
        .server
        .post(CHAT_PATH)
        .json(&test_data::chat_request("OPEN_AI", json!("false")))
        .await;

    assert_eq!(response.header(header::CONTENT_TYPE), "application/json");
    assert_eq!(response.json::<Value>(), json!({"ok": true}));
}

#[tokio::test]
async fn test_provider_receives_request_fields() {
    let app = scripted_app(Script::Complete(json!({})));

    app.server
        .post(CHAT_PATH)
        .json(&json!({
            "messages": [
                {"role": "system", "content": "Be terse."},
                {"role": "user", "content": "hi"}
            ],
            "model": "claude-3-5-sonnet-latest",
            "provider": "ANTHROPIC",
            "parameters": {"temperature": 0.3, "stream": true}
        }))
        .await
        .assert_status_ok();

    let calls = app.provider.calls();
    assert_eq!(calls.len(), 1);

    let call = &calls[0];
    assert_eq!(call.provider, Provider::Anthropic);
    assert_eq!(call.model.as_deref(), Some("claude-3-5-sonnet-latest"));
    assert_eq!(call.messages.len(), 2);
    assert_eq!(call.credential.expose(), "test-anthropic-api-key");
    assert!(!call.stream);
    assert_eq!(call.parameters.len(), 1);
    assert_eq!(call.parameters["temperature"], json!(0.3));
}

#[tokio::test]
async fn test_provider_failure_keeps_committed_status() {
    let failure = FailureInfo::new("upstream said no")
        .with_status(429)
        .with_provider_label("openai")
        .with_message("Rate limit reached for gpt-4");
    let app = scripted_app(Script::Fail(failure));

    let response = app
        .server
        .post(CHAT_PATH)
        .json(&test_data::buffered_request())
        .await;

    response.assert_status(StatusCode::OK);
    assert_eq!(
        response.json::<Value>(),
        json!({
            "error": "OPENAI API error: 429",
            "details": "Rate limit reached for gpt-4"
        })
    );
}

#[tokio::test]
async fn test_provider_failure_without_status_or_label() {
    let app = scripted_app(Script::Fail(FailureInfo::new("socket closed")));

    let response = app
        .server
        .post(CHAT_PATH)
        .json(&test_data::buffered_request())
        .await;

    let body: Value = response.json();
    assert_eq!(body["error"], "OPEN_AI API error: 500");
    assert_eq!(body["details"], "socket closed");
}

#[tokio::test]
async fn test_provider_panic_yields_error_document() {
    let app = scripted_app(Script::Panic);

    let response = app
        .server
        .post(CHAT_PATH)
        .json(&test_data::buffered_request())
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["error"], "OPEN_AI API error: 500");
    assert!(body["details"].as_str().unwrap().contains("panicked"));
}
