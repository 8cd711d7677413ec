//! End-to-end tests through the HTTP provider against a mock upstream

use axum::http::header;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use crate::common::{constants::CHAT_PATH, frame_types, frames, http_app, test_data};
use crate::mocks::MockUpstream;

#[tokio::test]
async fn test_openai_buffered_completion() {
    let upstream = MockUpstream::start().await;
    upstream
        .mock_chat_completion(test_data::completion_result())
        .await;
    let server = http_app(&upstream.uri());

    let response = server
        .post(CHAT_PATH)
        .json(&json!({
            "messages": [{"role": "user", "content": "hi"}],
            "model": "gpt-4",
            "provider": "OPEN_AI",
            "parameters": {"temperature": 0.2, "model": "ignored"}
        }))
        .await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>(), test_data::completion_result());

    let requests = upstream.received_requests().await;
    assert_eq!(requests.len(), 1);
    let sent: Value = requests[0].body_json().expect("upstream body is JSON");
    assert_eq!(
        sent,
        json!({
            "model": "gpt-4",
            "messages": [{"role": "user", "content": "hi"}],
            "stream": false,
            "temperature": 0.2
        })
    );
}

#[tokio::test]
async fn test_openai_stream_is_relayed_without_done_marker() {
    let upstream = MockUpstream::start().await;
    upstream
        .mock_chat_completion_stream(&[
            test_data::delta_chunk("Hel"),
            test_data::delta_chunk("lo"),
        ])
        .await;
    let server = http_app(&upstream.uri());

    let response = server
        .post(CHAT_PATH)
        .json(&test_data::streaming_request())
        .await;

    response.assert_status_ok();
    assert_eq!(response.header(header::CONTENT_TYPE), "text/event-stream");

    let text = response.text();
    assert!(!text.contains("[DONE]"));

    let frames = frames(&text);
    assert_eq!(frame_types(&frames), vec!["start", "chunk", "chunk", "done"]);
    assert_eq!(frames[1]["chunk"], test_data::delta_chunk("Hel"));
    assert_eq!(frames[2]["chunk"], test_data::delta_chunk("lo"));

    let requests = upstream.received_requests().await;
    let sent: Value = requests[0].body_json().expect("upstream body is JSON");
    assert_eq!(sent["stream"], json!(true));
}

#[tokio::test]
async fn test_upstream_error_is_normalized() {
    let upstream = MockUpstream::start().await;
    upstream
        .mock_chat_completion_error(
            401,
            json!({"error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}}),
        )
        .await;
    let server = http_app(&upstream.uri());

    let response = server
        .post(CHAT_PATH)
        .json(&test_data::buffered_request())
        .await;

    response.assert_status_ok();
    assert_eq!(
        response.json::<Value>(),
        json!({
            "error": "OPENAI API error: 401",
            "details": "Incorrect API key provided"
        })
    );
}

#[tokio::test]
async fn test_upstream_error_on_stream_is_error_frame() {
    let upstream = MockUpstream::start().await;
    upstream
        .mock_chat_completion_error(503, json!({"message": "Service unavailable"}))
        .await;
    let server = http_app(&upstream.uri());

    let response = server
        .post(CHAT_PATH)
        .json(&test_data::streaming_request())
        .await;

    let frames = frames(&response.text());
    assert_eq!(frame_types(&frames), vec!["start", "error"]);
    assert_eq!(frames[1]["error"], "OPENAI API error: 503");
    assert_eq!(frames[1]["details"], "Service unavailable");
}

#[tokio::test]
async fn test_anthropic_buffered_lifts_system_prompt() {
    let upstream = MockUpstream::start().await;
    let message = json!({
        "id": "msg_01",
        "type": "message",
        "role": "assistant",
        "content": [{"type": "text", "text": "Hi there"}],
        "stop_reason": "end_turn"
    });
    upstream.mock_anthropic_message(message.clone()).await;
    let server = http_app(&upstream.uri());

    let response = server
        .post(CHAT_PATH)
        .json(&json!({
            "messages": [
                {"role": "system", "content": "Be brief."},
                {"role": "user", "content": "hi"}
            ],
            "model": "claude-3-5-sonnet-latest",
            "provider": "ANTHROPIC"
        }))
        .await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>(), message);

    let requests = upstream.received_requests().await;
    let sent: Value = requests[0].body_json().expect("upstream body is JSON");
    assert_eq!(sent["system"], "Be brief.");
    assert_eq!(sent["max_tokens"], 4096);
    assert_eq!(sent["messages"], json!([{"role": "user", "content": "hi"}]));
}

#[tokio::test]
async fn test_anthropic_stream_error_event() {
    let upstream = MockUpstream::start().await;
    let body = concat!(
        "event: message_start\n",
        "data: {\"type\":\"message_start\",\"message\":{\"id\":\"msg_01\"}}\n\n",
        "event: error\n",
        "data: {\"type\":\"error\",\"error\":{\"type\":\"overloaded_error\",\"message\":\"Overloaded\"}}\n\n",
        "event: content_block_delta\n",
        "data: {\"type\":\"content_block_delta\",\"delta\":{\"text\":\"never\"}}\n\n"
    );
    upstream.mock_anthropic_stream(body.to_string()).await;
    let server = http_app(&upstream.uri());

    let response = server
        .post(CHAT_PATH)
        .json(&test_data::chat_request("ANTHROPIC", json!(true)))
        .await;

    let frames = frames(&response.text());
    assert_eq!(frame_types(&frames), vec!["start", "chunk", "error"]);
    assert_eq!(frames[1]["chunk"]["type"], "message_start");
    assert_eq!(
        frames[2],
        json!({
            "type": "error",
            "error": "ANTHROPIC API error: 500",
            "details": "Overloaded"
        })
    );
}

#[tokio::test]
async fn test_unreachable_upstream_is_error_document() {
    // Nothing listens on port 1.
    let server = http_app("http://127.0.0.1:1");

    let response = server
        .post(CHAT_PATH)
        .json(&test_data::buffered_request())
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["error"], "OPENAI API error: 500");
    assert!(!body["details"].as_str().unwrap_or_default().is_empty());
}

#[tokio::test]
async fn test_message_entries_are_relayed_as_sent() {
    let upstream = MockUpstream::start().await;
    upstream
        .mock_chat_completion(test_data::completion_result())
        .await;
    let server = http_app(&upstream.uri());

    let messages = json!([
        {"content": "no role here"},
        {"role": "user", "content": [{"type": "text", "text": "hi"}], "name": "alice"}
    ]);
    let response = server
        .post(CHAT_PATH)
        .json(&json!({"messages": messages, "model": "gpt-4", "provider": "OPEN_AI"}))
        .await;

    response.assert_status_ok();

    let requests = upstream.received_requests().await;
    let sent: Value = requests[0].body_json().expect("upstream body is JSON");
    assert_eq!(sent["messages"], messages);
}
