//! Request logging utilities
//!
//! Provides structured logging with correlation IDs for tracing a chat
//! request from validation to its terminal outcome.

use std::time::Instant;
use tracing::{info, warn, Span};
use uuid::Uuid;

use crate::framing::ResponseMode;
use crate::normalize::NormalizedError;

/// Context for tracking a request through the system
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Unique identifier for this request (for log correlation)
    pub trace_id: String,
    /// When the request started
    pub start_time: Instant,
    /// Provider wire name, once validation has bound one
    pub provider: Option<String>,
    /// Model requested (if any)
    pub model: Option<String>,
    /// Committed response mode
    pub mode: ResponseMode,
}

impl RequestContext {
    /// Create a new request context
    pub fn new(mode: ResponseMode) -> Self {
        Self {
            trace_id: Uuid::new_v4().to_string()[..8].to_string(), // Short ID for readability
            start_time: Instant::now(),
            provider: None,
            model: None,
            mode,
        }
    }

    /// Set the provider for this request
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Set the model for this request
    pub fn with_model(mut self, model: Option<&str>) -> Self {
        self.model = model.map(str::to_string);
        self
    }

    /// Provider label for metrics (`"none"` before validation binds one)
    pub fn provider_label(&self) -> &str {
        self.provider.as_deref().unwrap_or("none")
    }

    /// Get elapsed time in milliseconds
    pub fn elapsed_ms(&self) -> u128 {
        self.start_time.elapsed().as_millis()
    }

    /// Log request initiation
    pub fn log_request_start(&self, messages: usize) {
        info!(
            trace_id = %self.trace_id,
            provider = %self.provider_label(),
            model = ?self.model,
            mode = self.mode.as_str(),
            messages = messages,
            "Processing chat completion request"
        );
    }

    /// Log a request refused before any provider call
    pub fn log_rejected(&self, status: u16, error: &NormalizedError) {
        warn!(
            trace_id = %self.trace_id,
            mode = self.mode.as_str(),
            status = status,
            error = %error.error,
            elapsed_ms = %self.elapsed_ms(),
            "Request rejected"
        );
    }

    /// Log a successful completion
    pub fn log_completed(&self, chunks: usize) {
        info!(
            trace_id = %self.trace_id,
            provider = %self.provider_label(),
            model = ?self.model,
            mode = self.mode.as_str(),
            chunks = chunks,
            elapsed_ms = %self.elapsed_ms(),
            "Chat completion finished"
        );
    }

    /// Log a provider failure after normalization
    pub fn log_failed(&self, chunks: usize, error: &NormalizedError) {
        warn!(
            trace_id = %self.trace_id,
            provider = %self.provider_label(),
            model = ?self.model,
            mode = self.mode.as_str(),
            chunks = chunks,
            error = %error.error,
            details = %error.details,
            elapsed_ms = %self.elapsed_ms(),
            "Chat completion failed"
        );
    }

    /// Log that the client went away mid-stream
    pub fn log_client_disconnected(&self, chunks: usize) {
        info!(
            trace_id = %self.trace_id,
            provider = %self.provider_label(),
            chunks = chunks,
            elapsed_ms = %self.elapsed_ms(),
            "Client disconnected before the stream finished"
        );
    }

    /// Create a tracing span for this request
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "chat_request",
            trace_id = %self.trace_id,
            provider = %self.provider_label(),
            model = ?self.model,
            mode = self.mode.as_str(),
        )
    }
}
