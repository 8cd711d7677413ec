//! Inbound request validation
//!
//! Turns a raw chat-completion request into a [`ChatRequest`] plus the
//! credential of the requested provider, or into the [`GatewayError`] that
//! short-circuits it. Checks run in a fixed order: method, JSON body,
//! messages, credential. Nothing here calls a provider.

use std::fmt;
use std::str::FromStr;

use axum::http::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use crate::credentials::{Credential, CredentialResolver};
use crate::error::{GatewayError, GatewayResult};
use crate::framing::ResponseMode;

/// Body keys that `parameters` may never override
const RESERVED_PARAMETERS: &[&str] = &["model", "messages", "stream", "api_key"];

/// Upstream language-model services
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Provider {
    OpenAi,
    Gemini,
    Anthropic,
    Perplexity,
}

impl Provider {
    pub const ALL: [Provider; 4] = [
        Provider::OpenAi,
        Provider::Gemini,
        Provider::Anthropic,
        Provider::Perplexity,
    ];

    /// Identifier used on the wire (`"OPEN_AI"`, `"GEMINI"`, ...)
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::OpenAi => "OPEN_AI",
            Provider::Gemini => "GEMINI",
            Provider::Anthropic => "ANTHROPIC",
            Provider::Perplexity => "PERPLEXITY",
        }
    }

    /// Vendor name attached to upstream failures
    pub fn vendor(self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Gemini => "gemini",
            Provider::Anthropic => "anthropic",
            Provider::Perplexity => "perplexity",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown provider: {0}")]
pub struct UnknownProvider(pub String);

impl FromStr for Provider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Provider::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| UnknownProvider(s.to_string()))
    }
}

/// One entry of the conversation history
///
/// Only the object shape is checked; entries are relayed as sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Value,
    // Pass through any extra fields (name, tool_calls, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Some(role.into()),
            content: Value::String(content.into()),
            extra: Map::new(),
        }
    }
}

/// A validated chat-completion request
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub model: Option<String>,
    pub provider: Provider,
    pub stream: bool,
    pub parameters: Map<String, Value>,
}

/// Output of a successful validation
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    pub request: ChatRequest,
    pub credential: Credential,
}

/// Validate an inbound request.
///
/// An empty body counts as `{}`. A body that parses to something other than
/// an object is treated as an object without fields.
pub fn validate(
    method: &Method,
    body: &[u8],
    credentials: &dyn CredentialResolver,
) -> GatewayResult<ValidatedRequest> {
    if method != Method::POST {
        return Err(GatewayError::MethodNotAllowed);
    }

    let parsed: Value = if body.is_empty() {
        Value::Object(Map::new())
    } else {
        serde_json::from_slice(body).map_err(GatewayError::MalformedRequestBody)?
    };
    let empty = Map::new();
    let fields = parsed.as_object().unwrap_or(&empty);

    let messages = parse_messages(fields.get("messages"))?;

    let provider = fields
        .get("provider")
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<Provider>().ok());
    let credential = provider
        .and_then(|p| credentials.resolve(p))
        .filter(|c| !c.expose().trim().is_empty());

    let (provider, credential) = match (provider, credential) {
        (Some(provider), Some(credential)) => (provider, credential),
        (provider, _) => {
            return Err(GatewayError::missing_credential(provider.map(Provider::as_str)))
        }
    };

    let request = ChatRequest {
        messages,
        model: fields.get("model").and_then(Value::as_str).map(str::to_string),
        provider,
        stream: ResponseMode::from_value(&parsed).is_streamed(),
        parameters: parse_parameters(fields.get("parameters")),
    };

    Ok(ValidatedRequest {
        request,
        credential,
    })
}

fn parse_messages(raw: Option<&Value>) -> GatewayResult<Vec<ChatMessage>> {
    let entries = match raw {
        Some(Value::Array(entries)) if !entries.is_empty() => entries,
        _ => {
            return Err(GatewayError::MissingRequiredField {
                details: "The request must include a non-empty messages array".to_string(),
            })
        }
    };

    entries
        .iter()
        .map(|entry| serde_json::from_value::<ChatMessage>(entry.clone()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| GatewayError::MissingRequiredField {
            details: "Each message must be an object".to_string(),
        })
}

fn parse_parameters(raw: Option<&Value>) -> Map<String, Value> {
    match raw {
        Some(Value::Object(map)) => map
            .iter()
            .filter(|(key, _)| {
                let reserved = RESERVED_PARAMETERS.contains(&key.as_str());
                if reserved {
                    warn!(parameter = %key, "Ignoring reserved key in parameters");
                }
                !reserved
            })
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
        Some(Value::Null) | None => Map::new(),
        Some(other) => {
            warn!(kind = %json_kind(other), "Ignoring non-object parameters");
            Map::new()
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
