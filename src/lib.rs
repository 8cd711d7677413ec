//! LLM Relay - chat-completion gateway for interchangeable LLM providers
//!
//! This library provides the core functionality for the relay server. It
//! validates chat requests, relays them to a provider, and answers with a
//! single JSON document or a live event stream with exactly one terminal
//! event.

pub mod config;
pub mod credentials;
pub mod error;
pub mod framing;
pub mod logging;
pub mod normalize;
pub mod orchestrator;
pub mod provider;
pub mod routes;
pub mod streaming;
pub mod validation;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;

pub use crate::config::Config;
pub use crate::credentials::{ConfiguredCredentials, Credential, CredentialResolver};
pub use crate::error::{GatewayError, GatewayResult};
pub use crate::framing::{ProtocolEvent, ResponseMode};
pub use crate::normalize::{normalize, FailureInfo, NormalizedError};
pub use crate::orchestrator::{Orchestrator, OrchestratorSettings};
pub use crate::provider::{CompletionProvider, HttpCompletionProvider};
pub use crate::validation::Provider;

/// Application state shared across all request handlers
pub struct AppState {
    pub config: Config,
    pub start_time: Instant,
    /// Credential lookup for provider calls and health reporting
    pub credentials: Arc<dyn CredentialResolver>,
    /// Request validation, provider execution and response framing
    pub orchestrator: Orchestrator,
}

impl AppState {
    /// Create a new application state
    pub fn new(config: Config) -> Result<Self> {
        // Initialize HTTP client with connection pooling
        let http_client = reqwest::Client::builder()
            .pool_max_idle_per_host(100)
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        let provider: Arc<dyn CompletionProvider> = Arc::new(HttpCompletionProvider::new(
            http_client,
            provider::http::ProviderEndpoints::from_config(&config),
        ));

        // Credentials are captured once; the request path never reads the environment.
        let credentials: Arc<dyn CredentialResolver> =
            Arc::new(ConfiguredCredentials::from_config(&config));

        Self::build(config, provider, credentials)
    }

    /// Create an application state around caller-supplied collaborators
    ///
    /// Lets integration tests swap in a scripted provider and fixed credentials.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn with_components(
        config: Config,
        provider: Arc<dyn CompletionProvider>,
        credentials: Arc<dyn CredentialResolver>,
    ) -> Result<Self> {
        Self::build(config, provider, credentials)
    }

    fn build(
        config: Config,
        provider: Arc<dyn CompletionProvider>,
        credentials: Arc<dyn CredentialResolver>,
    ) -> Result<Self> {
        let orchestrator = Orchestrator::new(
            provider,
            credentials.clone(),
            OrchestratorSettings::from_config(&config),
        )?;

        Ok(Self {
            config,
            start_time: Instant::now(),
            credentials,
            orchestrator,
        })
    }
}
