//! Provider failure normalization
//!
//! Every failure raised by a completion provider is folded into one
//! `{error, details}` shape before it reaches the client, whichever
//! vendor produced it and whichever response mode is active.

use serde::{Deserialize, Serialize};

/// Status reported when a failure carries none of its own
pub const DEFAULT_FAILURE_STATUS: u16 = 500;

/// Provider label used when neither the failure nor the request names one
pub const UNKNOWN_PROVIDER_LABEL: &str = "Unknown";

/// Structured description of a failed provider call.
///
/// Built by the provider boundary adapter; every field except the string
/// form is optional because vendors report failures very differently.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FailureInfo {
    /// Upstream HTTP status, when the failure came from a response
    pub status_code: Option<u16>,
    /// Provider identifier attached by the adapter (e.g. `"openai"`)
    pub provider_label: Option<String>,
    /// Human-readable cause
    pub message: Option<String>,
    /// Raw upstream response body
    pub body: Option<String>,
    /// String form of the failure
    pub description: String,
}

impl FailureInfo {
    /// Create a failure from its string form
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    pub fn with_provider_label(mut self, label: impl Into<String>) -> Self {
        self.provider_label = Some(label.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

impl std::fmt::Display for FailureInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.description)
    }
}

impl From<reqwest::Error> for FailureInfo {
    fn from(err: reqwest::Error) -> Self {
        let mut failure = FailureInfo::new(err.to_string()).with_message(err.to_string());
        failure.status_code = err.status().map(|s| s.as_u16());
        failure
    }
}

/// Uniform error body sent to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedError {
    pub error: String,
    pub details: String,
}

impl NormalizedError {
    pub fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: details.into(),
        }
    }
}

/// Normalize a provider failure.
///
/// The provider label prefers the one attached to the failure, then the
/// request's declared provider, then [`UNKNOWN_PROVIDER_LABEL`]. Details
/// prefer the human message, then the raw body, then the string form, and
/// are never empty. The function is pure: the same failure always yields
/// the same result.
pub fn normalize(failure: &FailureInfo, declared_provider: Option<&str>) -> NormalizedError {
    let status = failure.status_code.unwrap_or(DEFAULT_FAILURE_STATUS);

    let label = first_present([failure.provider_label.as_deref(), declared_provider])
        .unwrap_or(UNKNOWN_PROVIDER_LABEL);

    let details = first_present([
        failure.message.as_deref(),
        failure.body.as_deref(),
        Some(failure.description.as_str()),
    ])
    .unwrap_or("Unknown error");

    NormalizedError {
        error: format!("{} API error: {}", label.to_uppercase(), status),
        details: details.to_string(),
    }
}

/// First candidate that is present and not blank
fn first_present<'a, const N: usize>(candidates: [Option<&'a str>; N]) -> Option<&'a str> {
    candidates
        .into_iter()
        .flatten()
        .find(|value| !value.trim().is_empty())
}
