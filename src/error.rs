//! Error types for LLM Relay
//!
//! This module defines the request-path error taxonomy. Every variant can be
//! rendered as the uniform `{error, details}` body regardless of response mode.

use axum::http::StatusCode;
use thiserror::Error;

use crate::normalize::NormalizedError;

/// Provider label used when the request never named a usable provider
pub const PLACEHOLDER_PROVIDER_LABEL: &str = "LLM Provider";

/// Gateway request errors
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Method not allowed: Use POST")]
    MethodNotAllowed,

    #[error("Invalid request: JSON parsing failed")]
    MalformedRequestBody(#[source] serde_json::Error),

    #[error("Invalid request: Messages array is required")]
    MissingRequiredField { details: String },

    #[error("{label} API key is not configured")]
    MissingCredential { label: String },

    #[error("{}", .0.error)]
    ProviderFailure(NormalizedError),
}

impl GatewayError {
    /// Missing-credential error for a provider label, if one was bound
    pub fn missing_credential(provider: Option<&str>) -> Self {
        let label = provider
            .map(str::to_uppercase)
            .unwrap_or_else(|| PLACEHOLDER_PROVIDER_LABEL.to_string());
        GatewayError::MissingCredential { label }
    }

    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            GatewayError::MalformedRequestBody(_) => StatusCode::BAD_REQUEST,
            GatewayError::MissingRequiredField { .. } => StatusCode::BAD_REQUEST,
            GatewayError::MissingCredential { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            // Headers are already committed by the time a provider fails.
            GatewayError::ProviderFailure(_) => StatusCode::OK,
        }
    }

    /// Short machine-friendly reason, used for metrics labels
    pub fn reason(&self) -> &'static str {
        match self {
            GatewayError::MethodNotAllowed => "method_not_allowed",
            GatewayError::MalformedRequestBody(_) => "malformed_body",
            GatewayError::MissingRequiredField { .. } => "missing_field",
            GatewayError::MissingCredential { .. } => "missing_credential",
            GatewayError::ProviderFailure(_) => "provider_failure",
        }
    }

    /// Human-readable cause
    pub fn details(&self) -> String {
        match self {
            GatewayError::MethodNotAllowed => {
                "This endpoint only accepts POST requests".to_string()
            }
            GatewayError::MalformedRequestBody(_) => {
                "The request body must be valid JSON".to_string()
            }
            GatewayError::MissingRequiredField { details } => details.clone(),
            GatewayError::MissingCredential { .. } => {
                "The API key for this provider is missing in environment variables".to_string()
            }
            GatewayError::ProviderFailure(normalized) => normalized.details.clone(),
        }
    }

    /// The `{error, details}` body for this error
    pub fn to_normalized(&self) -> NormalizedError {
        match self {
            GatewayError::ProviderFailure(normalized) => normalized.clone(),
            other => NormalizedError::new(other.to_string(), other.details()),
        }
    }
}

impl From<NormalizedError> for GatewayError {
    fn from(normalized: NormalizedError) -> Self {
        GatewayError::ProviderFailure(normalized)
    }
}

/// Result type alias for convenience
pub type GatewayResult<T> = Result<T, GatewayError>;
