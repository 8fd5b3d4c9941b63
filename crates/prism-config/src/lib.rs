//! Resolved provider configuration for Prism
//!
//! The surrounding assistant resolves environment variables, settings files,
//! and CLI flags into a single [`ProviderConfig`] before a provider is
//! constructed. This crate only defines that resolved shape; discovery and
//! persistence live outside the core.

use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// Configuration for a single LLM provider instance
///
/// Constructed once per session or provider switch and immutable for the
/// lifetime of the provider built from it.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Provider tag selecting the translator ("gemini", "openai", ...)
    pub provider: String,
    /// API key for backends that require authentication
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// Base URL override for self-hosted or compatible endpoints
    #[serde(default)]
    pub base_url: Option<Url>,
    /// Backend model identifier
    pub model: String,
}

impl ProviderConfig {
    /// Create a configuration with just a provider tag and model
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            api_key: None,
            base_url: None,
            model: model.into(),
        }
    }

    /// Attach an API key
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(key.into()));
        self
    }

    /// Override the backend base URL
    #[must_use]
    pub fn with_base_url(mut self, url: Url) -> Self {
        self.base_url = Some(url);
        self
    }
}
