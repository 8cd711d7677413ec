//! Anthropic request shaping
//!
//! Anthropic's messages API differs from the OpenAI-compatible surface:
//! - System messages go to a separate `system` field, not in messages array
//! - `max_tokens` is mandatory

use serde_json::{Map, Value};

use super::{message_value, CompletionCall};
use crate::validation::ChatMessage;

/// API version header value sent with every request
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// `max_tokens` used when the caller does not supply one
pub const DEFAULT_MAX_TOKENS: u64 = 4096;

/// Build the messages API body for a call
pub fn request_body(call: &CompletionCall) -> Value {
    let (system, messages) = extract_system_prompt(&call.messages);

    let mut body = Map::new();
    if let Some(ref model) = call.model {
        body.insert("model".to_string(), Value::String(model.clone()));
    }
    body.insert(
        "messages".to_string(),
        Value::Array(messages.into_iter().map(message_value).collect()),
    );
    if let Some(system) = system {
        body.insert("system".to_string(), Value::String(system));
    }
    body.insert("max_tokens".to_string(), Value::from(DEFAULT_MAX_TOKENS));
    body.insert("stream".to_string(), Value::Bool(call.stream));

    // Caller parameters win over the defaults above (max_tokens, system).
    for (key, value) in &call.parameters {
        body.insert(key.clone(), value.clone());
    }

    Value::Object(body)
}

/// Split system messages off the conversation, joining their text
pub fn extract_system_prompt(messages: &[ChatMessage]) -> (Option<String>, Vec<&ChatMessage>) {
    let (system, rest): (Vec<&ChatMessage>, Vec<&ChatMessage>) =
        messages.iter().partition(|m| m.role.as_deref() == Some("system"));

    let system_prompt = if system.is_empty() {
        None
    } else {
        Some(
            system
                .iter()
                .map(|m| content_text(&m.content))
                .collect::<Vec<_>>()
                .join("\n"),
        )
    };

    (system_prompt, rest)
}

/// Flatten message content to plain text
fn content_text(content: &Value) -> String {
    match content {
        Value::String(text) => text.clone(),
        Value::Array(parts) => parts
            .iter()
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
