//! Configuration management for LLM Relay
//!
//! Configuration is loaded from environment variables.

use anyhow::{Context, Result};
use std::env;

/// Application configuration
#[derive(Clone)]
pub struct Config {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,

    /// Whether the runtime can deliver chunked event-stream responses
    pub streaming_supported: bool,
    /// Upstream request timeout (in seconds)
    pub request_timeout_seconds: u64,
    /// Number of frames buffered between the orchestrator and the client
    pub stream_buffer: usize,

    /// OpenAI API URL
    pub openai_api_url: String,
    /// OpenAI API key
    pub openai_api_key: Option<String>,

    /// Gemini API URL (OpenAI-compatible surface)
    pub gemini_api_url: String,
    /// Gemini API key
    pub gemini_api_key: Option<String>,

    /// Anthropic API URL
    pub anthropic_api_url: String,
    /// Anthropic API key
    pub anthropic_api_key: Option<String>,

    /// Perplexity API URL
    pub perplexity_api_url: String,
    /// Perplexity API key
    pub perplexity_api_key: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: env::var("RELAY_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("RELAY_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("Invalid RELAY_PORT")?,

            streaming_supported: env::var("RELAY_STREAMING_SUPPORTED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(true),
            request_timeout_seconds: env::var("RELAY_REQUEST_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .context("Invalid RELAY_REQUEST_TIMEOUT_SECONDS")?,
            stream_buffer: env::var("RELAY_STREAM_BUFFER")
                .unwrap_or_else(|_| "32".to_string())
                .parse()
                .context("Invalid RELAY_STREAM_BUFFER")?,

            openai_api_url: env::var("OPENAI_API_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            openai_api_key: non_empty_var("OPENAI_API_KEY"),

            gemini_api_url: env::var("GEMINI_API_URL").unwrap_or_else(|_| {
                "https://generativelanguage.googleapis.com/v1beta/openai".to_string()
            }),
            gemini_api_key: non_empty_var("GEMINI_API_KEY"),

            anthropic_api_url: env::var("ANTHROPIC_API_URL")
                .unwrap_or_else(|_| "https://api.anthropic.com/v1".to_string()),
            anthropic_api_key: non_empty_var("ANTHROPIC_API_KEY"),

            perplexity_api_url: env::var("PERPLEXITY_API_URL")
                .unwrap_or_else(|_| "https://api.perplexity.ai".to_string()),
            perplexity_api_key: non_empty_var("PERPLEXITY_API_KEY"),
        })
    }
}

// Keys stay out of logs even when the whole config is debug-printed.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("streaming_supported", &self.streaming_supported)
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .field("stream_buffer", &self.stream_buffer)
            .field("openai_api_url", &self.openai_api_url)
            .field("openai_api_key", &self.openai_api_key.as_ref().map(|_| "<redacted>"))
            .field("gemini_api_url", &self.gemini_api_url)
            .field("gemini_api_key", &self.gemini_api_key.as_ref().map(|_| "<redacted>"))
            .field("anthropic_api_url", &self.anthropic_api_url)
            .field("anthropic_api_key", &self.anthropic_api_key.as_ref().map(|_| "<redacted>"))
            .field("perplexity_api_url", &self.perplexity_api_url)
            .field("perplexity_api_key", &self.perplexity_api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Read an environment variable, treating an empty value as unset
fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Fixed configuration for unit tests; never reads the environment
#[cfg(test)]
pub(crate) fn sample_config() -> Config {
    let upstream = "http://127.0.0.1:1".to_string();
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        streaming_supported: true,
        request_timeout_seconds: 5,
        stream_buffer: 4,
        openai_api_url: upstream.clone(),
        openai_api_key: Some("sk-test".to_string()),
        gemini_api_url: upstream.clone(),
        gemini_api_key: None,
        anthropic_api_url: upstream.clone(),
        anthropic_api_key: None,
        perplexity_api_url: upstream,
        perplexity_api_key: None,
    }
}
