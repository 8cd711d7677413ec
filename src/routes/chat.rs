//! Chat completions endpoint
//!
//! Accepts a chat-completion request and answers with either a single JSON
//! document or an event stream, depending on the request's `stream` field.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::Method,
    response::Response,
};

use crate::AppState;

/// Handle chat completion requests
///
/// # Request Format
///
/// ```json
/// {
///   "messages": [...],          // Required, non-empty
///   "model": "gpt-4",           // Passed through to the provider
///   "provider": "OPEN_AI",      // OPEN_AI | GEMINI | ANTHROPIC | PERPLEXITY
///   "stream": false,            // Optional: true or "true" selects streaming
///   "parameters": {}            // Optional, merged into the provider call
/// }
/// ```
pub async fn chat_completions(
    State(state): State<Arc<AppState>>,
    method: Method,
    body: Bytes,
) -> Response {
    state.orchestrator.handle(&method, &body).await
}
