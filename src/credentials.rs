//! Provider credential resolution
//!
//! Credentials are resolved through the [`CredentialResolver`] trait so the
//! request path never reads process-wide state. The production resolver is
//! filled from [`Config`] once at startup.

use std::collections::HashMap;
use std::fmt;

use crate::config::Config;
use crate::validation::Provider;

/// Opaque API credential for a provider
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Expose the secret for building an upstream request
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Looks up the credential configured for a provider
pub trait CredentialResolver: Send + Sync {
    /// Returns `None` when the provider has no usable credential
    fn resolve(&self, provider: Provider) -> Option<Credential>;

    /// Providers that currently resolve to a credential
    fn configured_providers(&self) -> Vec<Provider> {
        Provider::ALL
            .into_iter()
            .filter(|p| self.resolve(*p).is_some())
            .collect()
    }
}

/// Credentials captured from configuration at startup
#[derive(Debug, Clone, Default)]
pub struct ConfiguredCredentials {
    keys: HashMap<Provider, Credential>,
}

impl ConfiguredCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture every configured provider key
    pub fn from_config(config: &Config) -> Self {
        let entries = [
            (Provider::OpenAi, &config.openai_api_key),
            (Provider::Gemini, &config.gemini_api_key),
            (Provider::Anthropic, &config.anthropic_api_key),
            (Provider::Perplexity, &config.perplexity_api_key),
        ];

        entries
            .into_iter()
            .filter_map(|(provider, key)| key.as_ref().map(|k| (provider, k)))
            .fold(Self::new(), |creds, (provider, key)| creds.with(provider, key.clone()))
    }

    /// Add a credential; blank secrets are ignored
    pub fn with(mut self, provider: Provider, secret: impl Into<String>) -> Self {
        let secret = secret.into();
        if !secret.trim().is_empty() {
            self.keys.insert(provider, Credential::new(secret));
        }
        self
    }
}

impl CredentialResolver for ConfiguredCredentials {
    fn resolve(&self, provider: Provider) -> Option<Credential> {
        self.keys.get(&provider).cloned()
    }
}
