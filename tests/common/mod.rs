//! Common test utilities for LLM Relay
//!
//! Shared fixtures, app builders and helpers used across the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum_test::TestServer;
use serde_json::{json, Value};

use llm_relay::{
    framing::parse_frames,
    provider::{
        http::ProviderEndpoints,
        scripted::{Script, ScriptedProvider},
    },
    routes, AppState, CompletionProvider, Config, ConfiguredCredentials, CredentialResolver,
    HttpCompletionProvider, Provider,
};

/// Test configuration constants
pub mod constants {
    /// API key configured for OpenAI
    pub const TEST_OPENAI_API_KEY: &str = "test-openai-api-key";
    /// API key configured for Anthropic
    pub const TEST_ANTHROPIC_API_KEY: &str = "test-anthropic-api-key";
    /// Chat endpoint
    pub const CHAT_PATH: &str = "/v1/chat/completions";
}

/// Configuration that never touches the process environment
pub fn test_config(upstream_url: &str) -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0, // Let OS assign port
        streaming_supported: true,
        request_timeout_seconds: 5,
        stream_buffer: 8,
        openai_api_url: upstream_url.to_string(),
        openai_api_key: Some(constants::TEST_OPENAI_API_KEY.to_string()),
        gemini_api_url: upstream_url.to_string(),
        gemini_api_key: None,
        anthropic_api_url: upstream_url.to_string(),
        anthropic_api_key: Some(constants::TEST_ANTHROPIC_API_KEY.to_string()),
        perplexity_api_url: upstream_url.to_string(),
        perplexity_api_key: None,
    }
}

/// OpenAI and Anthropic configured; Gemini and Perplexity not
pub fn test_credentials() -> ConfiguredCredentials {
    ConfiguredCredentials::new()
        .with(Provider::OpenAi, constants::TEST_OPENAI_API_KEY)
        .with(Provider::Anthropic, constants::TEST_ANTHROPIC_API_KEY)
}

/// A running app plus the scripted provider behind it
pub struct ScriptedApp {
    pub server: TestServer,
    pub provider: Arc<ScriptedProvider>,
}

/// Build the router around a scripted provider
pub fn scripted_app(script: Script) -> ScriptedApp {
    scripted_app_with_credentials(script, test_credentials())
}

pub fn scripted_app_with_credentials(
    script: Script,
    credentials: ConfiguredCredentials,
) -> ScriptedApp {
    let provider = Arc::new(ScriptedProvider::new(script));
    let state = AppState::with_components(
        test_config("http://127.0.0.1:1"),
        provider.clone() as Arc<dyn CompletionProvider>,
        Arc::new(credentials) as Arc<dyn CredentialResolver>,
    )
    .expect("Failed to build app state");

    let server = TestServer::new(routes::create_router(Arc::new(state)))
        .expect("Failed to create test server");

    ScriptedApp { server, provider }
}

/// Build the router around the real HTTP provider pointed at `upstream_url`
pub fn http_app(upstream_url: &str) -> TestServer {
    let provider = HttpCompletionProvider::new(
        reqwest::Client::new(),
        ProviderEndpoints::uniform(upstream_url),
    );
    let state = AppState::with_components(
        test_config(upstream_url),
        Arc::new(provider),
        Arc::new(test_credentials()),
    )
    .expect("Failed to build app state");

    TestServer::new(routes::create_router(Arc::new(state))).expect("Failed to create test server")
}

/// Frame envelopes of a streamed body
pub fn frames(body: &str) -> Vec<Value> {
    parse_frames(body.as_bytes())
}

/// `type` of each frame, in order
pub fn frame_types(frames: &[Value]) -> Vec<String> {
    frames
        .iter()
        .map(|f| f["type"].as_str().unwrap_or_default().to_string())
        .collect()
}

/// Sample request bodies
pub mod test_data {
    use super::*;

    /// Chat request for `provider` with the given `stream` value
    pub fn chat_request(provider: &str, stream: Value) -> Value {
        json!({
            "messages": [{"role": "user", "content": "hi"}],
            "model": "gpt-4",
            "provider": provider,
            "stream": stream
        })
    }

    pub fn buffered_request() -> Value {
        chat_request("OPEN_AI", json!(false))
    }

    pub fn streaming_request() -> Value {
        chat_request("OPEN_AI", json!(true))
    }

    /// A typical buffered completion result
    pub fn completion_result() -> Value {
        json!({
            "id": "chatcmpl-test123",
            "object": "chat.completion",
            "created": 1706745600,
            "model": "gpt-4",
            "choices": [
                {
                    "index": 0,
                    "message": {"role": "assistant", "content": "Hello! How can I help you today?"},
                    "finish_reason": "stop"
                }
            ],
            "usage": {"prompt_tokens": 10, "completion_tokens": 8, "total_tokens": 18}
        })
    }

    /// A streamed delta chunk
    pub fn delta_chunk(content: &str) -> Value {
        json!({
            "id": "chatcmpl-test123",
            "object": "chat.completion.chunk",
            "choices": [{"index": 0, "delta": {"content": content}, "finish_reason": null}]
        })
    }
}
