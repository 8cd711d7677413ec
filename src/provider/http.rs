//! HTTP completion provider
//!
//! Calls the vendors' public HTTP APIs with `reqwest`. OpenAI, Gemini and
//! Perplexity share the OpenAI-compatible chat completions surface;
//! Anthropic uses its messages API.

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::{anthropic, ChunkStream, CompletionCall, CompletionProvider};
use crate::config::Config;
use crate::normalize::FailureInfo;
use crate::streaming::{data_payload, SseLineBuffer};
use crate::validation::Provider;

/// Base URLs of the upstream APIs
#[derive(Debug, Clone)]
pub struct ProviderEndpoints {
    pub openai: String,
    pub gemini: String,
    pub anthropic: String,
    pub perplexity: String,
}

impl ProviderEndpoints {
    pub fn from_config(config: &Config) -> Self {
        Self {
            openai: config.openai_api_url.clone(),
            gemini: config.gemini_api_url.clone(),
            anthropic: config.anthropic_api_url.clone(),
            perplexity: config.perplexity_api_url.clone(),
        }
    }

    /// Every provider served from one base URL (useful against a local mock)
    pub fn uniform(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            openai: base_url.clone(),
            gemini: base_url.clone(),
            anthropic: base_url.clone(),
            perplexity: base_url,
        }
    }

    fn base_url(&self, provider: Provider) -> &str {
        let url = match provider {
            Provider::OpenAi => &self.openai,
            Provider::Gemini => &self.gemini,
            Provider::Anthropic => &self.anthropic,
            Provider::Perplexity => &self.perplexity,
        };
        url.trim_end_matches('/')
    }
}

/// Completion provider backed by the vendors' HTTP APIs
pub struct HttpCompletionProvider {
    client: reqwest::Client,
    endpoints: ProviderEndpoints,
}

impl HttpCompletionProvider {
    /// Create a new HTTP provider
    pub fn new(client: reqwest::Client, endpoints: ProviderEndpoints) -> Self {
        Self { client, endpoints }
    }

    fn request(&self, call: &CompletionCall) -> (String, reqwest::RequestBuilder) {
        let base = self.endpoints.base_url(call.provider);

        match call.provider {
            Provider::Anthropic => {
                let url = format!("{}/messages", base);
                let builder = self
                    .client
                    .post(&url)
                    .header("x-api-key", call.credential.expose())
                    .header("anthropic-version", anthropic::ANTHROPIC_VERSION)
                    .json(&anthropic::request_body(call));
                (url, builder)
            }
            Provider::OpenAi | Provider::Gemini | Provider::Perplexity => {
                let url = format!("{}/chat/completions", base);
                let builder = self
                    .client
                    .post(&url)
                    .bearer_auth(call.credential.expose())
                    .json(&call.body());
                (url, builder)
            }
        }
    }

    /// Send the request and turn any non-2xx answer into a failure
    async fn send(&self, call: &CompletionCall) -> Result<reqwest::Response, FailureInfo> {
        let vendor = call.provider.vendor();
        let (url, builder) = self.request(call);

        debug!(url = %url, provider = vendor, stream = call.stream, "Sending request to provider");

        let response = builder
            .send()
            .await
            .map_err(|e| FailureInfo::from(e).with_provider_label(vendor))?;

        let status = response.status();
        debug!(url = %url, status = %status, "Received response from provider");

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(upstream_failure(vendor, status.as_u16(), text));
        }

        Ok(response)
    }
}

#[async_trait]
impl CompletionProvider for HttpCompletionProvider {
    fn name(&self) -> &'static str {
        "http"
    }

    #[instrument(skip(self, call), fields(provider = %call.provider, model = ?call.model))]
    async fn complete(&self, call: CompletionCall) -> Result<Value, FailureInfo> {
        let vendor = call.provider.vendor();
        let response = self.send(&call).await?;

        response
            .json::<Value>()
            .await
            .map_err(|e| FailureInfo::from(e).with_provider_label(vendor))
    }

    #[instrument(skip(self, call), fields(provider = %call.provider, model = ?call.model))]
    async fn complete_stream(&self, call: CompletionCall) -> Result<ChunkStream, FailureInfo> {
        let vendor = call.provider.vendor();
        let response = self.send(&call).await?;

        let is_event_stream = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.starts_with("text/event-stream"))
            .unwrap_or(false);
        if !is_event_stream {
            warn!(provider = vendor, "Provider answered a streaming call without an event stream");
        }

        Ok(Box::pin(sse_json_stream(response.bytes_stream(), vendor)))
    }
}

/// Build a failure from a non-2xx upstream answer
fn upstream_failure(vendor: &'static str, status: u16, body: String) -> FailureInfo {
    let mut failure = FailureInfo::new(format!("{} API request failed with status {}", vendor, status))
        .with_status(status)
        .with_provider_label(vendor);

    if let Some(message) = error_message(&body) {
        failure = failure.with_message(message);
    }
    if !body.is_empty() {
        failure = failure.with_body(body);
    }
    failure
}

/// Pull a human message out of a vendor error body.
///
/// Handles `{"error":{"message":..}}` (OpenAI, Anthropic, Perplexity),
/// `[{"error":{..}}]` (Gemini) and `{"message":..}`.
fn error_message(body: &str) -> Option<String> {
    let parsed: Value = serde_json::from_str(body).ok()?;
    let parsed = match parsed {
        Value::Array(mut items) if !items.is_empty() => items.swap_remove(0),
        other => other,
    };

    parsed
        .get("error")
        .and_then(|e| e.get("message").or(Some(e)))
        .and_then(Value::as_str)
        .or_else(|| parsed.get("message").and_then(Value::as_str))
        .map(str::to_string)
}

/// Outcome of one SSE line from upstream
#[derive(Debug, PartialEq)]
enum DataLine {
    Skip,
    Done,
    Payload(Value),
    Failure(FailureInfo),
}

fn parse_data_line(line: &str, vendor: &'static str) -> DataLine {
    let Some(payload) = data_payload(line) else {
        return DataLine::Skip;
    };
    if payload.is_empty() {
        return DataLine::Skip;
    }
    if payload == "[DONE]" {
        return DataLine::Done;
    }

    let value: Value = match serde_json::from_str(payload) {
        Ok(value) => value,
        Err(e) => {
            return DataLine::Failure(
                FailureInfo::new(format!("Malformed stream payload: {}", e))
                    .with_provider_label(vendor)
                    .with_body(payload.to_string()),
            )
        }
    };

    let is_error = value.get("type").and_then(Value::as_str) == Some("error")
        || value.get("error").is_some_and(|e| !e.is_null());
    if is_error {
        let status = value
            .get("error")
            .and_then(|e| e.get("code").or_else(|| e.get("status")))
            .and_then(Value::as_u64)
            .and_then(|c| u16::try_from(c).ok());
        let mut failure = FailureInfo::new(format!("{} stream error", vendor))
            .with_provider_label(vendor)
            .with_body(payload.to_string());
        if let Some(message) = error_message(payload) {
            failure = failure.with_message(message);
        }
        if let Some(status) = status {
            failure = failure.with_status(status);
        }
        return DataLine::Failure(failure);
    }

    DataLine::Payload(value)
}

/// Turn an upstream SSE byte stream into JSON partial results.
///
/// The sequence ends at `[DONE]`, at the end of the body, or right after
/// the first failure it yields.
fn sse_json_stream<S>(
    bytes: S,
    vendor: &'static str,
) -> impl Stream<Item = Result<Value, FailureInfo>> + Send
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
{
    async_stream::stream! {
        let mut buffer = SseLineBuffer::new();
        futures::pin_mut!(bytes);

        while let Some(next) = bytes.next().await {
            let chunk = match next {
                Ok(chunk) => chunk,
                Err(e) => {
                    yield Err(FailureInfo::from(e).with_provider_label(vendor));
                    return;
                }
            };

            for line in buffer.feed(&chunk) {
                match parse_data_line(&line, vendor) {
                    DataLine::Skip => {}
                    DataLine::Done => return,
                    DataLine::Payload(value) => yield Ok(value),
                    DataLine::Failure(failure) => {
                        yield Err(failure);
                        return;
                    }
                }
            }
        }

        if let Some(line) = buffer.take_remaining() {
            match parse_data_line(&line, vendor) {
                DataLine::Payload(value) => yield Ok(value),
                DataLine::Failure(failure) => yield Err(failure),
                DataLine::Skip | DataLine::Done => {}
            }
        }
    }
}
