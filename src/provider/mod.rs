//! Completion provider boundary
//!
//! Defines the trait interface for the component that actually talks to an
//! upstream language model. The orchestrator only ever sees a single JSON
//! result or a lazy sequence of partial results, and failures arrive as
//! [`FailureInfo`].

pub mod anthropic;
pub mod http;
#[cfg(any(test, feature = "test-utils"))]
pub mod scripted;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde_json::{Map, Value};

use crate::credentials::Credential;
use crate::normalize::FailureInfo;
use crate::validation::{ChatMessage, Provider, ValidatedRequest};

pub use http::HttpCompletionProvider;

/// Lazy sequence of partial results from a streaming completion
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<Value, FailureInfo>> + Send>>;

/// Everything a provider needs to run one completion
#[derive(Debug, Clone)]
pub struct CompletionCall {
    pub provider: Provider,
    pub model: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub credential: Credential,
    pub stream: bool,
    pub parameters: Map<String, Value>,
}

impl CompletionCall {
    pub fn from_validated(validated: ValidatedRequest) -> Self {
        let ValidatedRequest {
            request,
            credential,
        } = validated;

        Self {
            provider: request.provider,
            model: request.model,
            messages: request.messages,
            credential,
            stream: request.stream,
            parameters: request.parameters,
        }
    }

    /// OpenAI-style request body: fixed fields first, then `parameters`
    pub fn body(&self) -> Value {
        let mut body = Map::new();
        if let Some(ref model) = self.model {
            body.insert("model".to_string(), Value::String(model.clone()));
        }
        body.insert(
            "messages".to_string(),
            Value::Array(self.messages.iter().map(message_value).collect()),
        );
        body.insert("stream".to_string(), Value::Bool(self.stream));
        for (key, value) in &self.parameters {
            body.insert(key.clone(), value.clone());
        }
        Value::Object(body)
    }
}

/// Serialize a message without going through a fallible serializer
pub(crate) fn message_value(message: &ChatMessage) -> Value {
    let mut object = Map::new();
    if let Some(ref role) = message.role {
        object.insert("role".to_string(), Value::String(role.clone()));
    }
    object.insert("content".to_string(), message.content.clone());
    for (key, value) in &message.extra {
        object.insert(key.clone(), value.clone());
    }
    Value::Object(object)
}

/// Trait defining the interface for completion providers
///
/// Implementations own vendor specifics (endpoints, auth headers, payload
/// shapes, retries). They must never log or echo the credential.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Get the provider name for logging
    fn name(&self) -> &'static str;

    /// Run a completion and return the full result
    async fn complete(&self, call: CompletionCall) -> Result<Value, FailureInfo>;

    /// Run a completion and return its partial results as they arrive
    ///
    /// Failures before the first partial result are returned directly;
    /// later ones arrive as an `Err` item.
    async fn complete_stream(&self, call: CompletionCall) -> Result<ChunkStream, FailureInfo>;
}
