//! Tag-keyed provider registry

use std::collections::HashMap;
use std::sync::Arc;

use prism_config::ProviderConfig;

use crate::error::LlmError;
use crate::provider::{
    AnthropicProvider, GeminiProvider, OllamaProvider, OpenAiProvider, Provider,
};

/// Factory building a provider instance from resolved configuration
type ProviderFactory = Box<dyn Fn(&ProviderConfig) -> Result<Arc<dyn Provider>, LlmError> + Send + Sync>;

/// Registry mapping provider tags to factories
///
/// Construction goes through factories so that each configuration change or
/// provider switch yields a fresh instance; nothing is cached here.
#[derive(Default)]
pub struct ProviderRegistry {
    factories: HashMap<String, ProviderFactory>,
}

impl ProviderRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the four built-in providers registered
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("gemini", |config| Ok(Arc::new(GeminiProvider::new(config))));
        registry.register("openai", |config| Ok(Arc::new(OpenAiProvider::new(config))));
        registry.register("anthropic", |config| {
            Ok(Arc::new(AnthropicProvider::new(config)))
        });
        registry.register("ollama", |config| Ok(Arc::new(OllamaProvider::new(config))));
        registry
    }

    /// Register a factory under a tag
    ///
    /// Re-registering a tag replaces the previous factory.
    pub fn register<F>(&mut self, tag: impl Into<String>, factory: F)
    where
        F: Fn(&ProviderConfig) -> Result<Arc<dyn Provider>, LlmError> + Send + Sync + 'static,
    {
        self.factories.insert(tag.into(), Box::new(factory));
    }

    /// Whether a tag is registered
    pub fn has_provider(&self, tag: &str) -> bool {
        self.factories.contains_key(tag)
    }

    /// Registered tags, sorted
    pub fn list_providers(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.factories.keys().cloned().collect();
        tags.sort();
        tags
    }

    /// Build a provider for the configuration's tag
    pub fn create(&self, config: &ProviderConfig) -> Result<Arc<dyn Provider>, LlmError> {
        let Some(factory) = self.factories.get(&config.provider) else {
            return Err(LlmError::UnknownProvider {
                provider: config.provider.clone(),
                known: self.list_providers().join(", "),
            });
        };
        factory(config)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::types::{
        EmbedRequest, EmbedResponse, GenerateRequest, GenerateResponse, TokenCount,
    };

    struct CannedProvider;

    #[async_trait]
    impl Provider for CannedProvider {
        fn name(&self) -> &'static str {
            "canned"
        }

        fn validate_config(&self, _config: &ProviderConfig) -> bool {
            true
        }

        async fn generate_content(
            &self,
            _request: &GenerateRequest,
        ) -> Result<GenerateResponse, LlmError> {
            Ok(GenerateResponse::text_delta("canned"))
        }

        async fn generate_content_stream(
            &self,
            _request: &GenerateRequest,
        ) -> Result<crate::provider::ResponseStream, LlmError> {
            Ok(Box::pin(futures_util::stream::empty()))
        }

        async fn count_tokens(&self, _request: &GenerateRequest) -> Result<TokenCount, LlmError> {
            Ok(TokenCount { total_tokens: 0 })
        }

        async fn embed_content(&self, _request: &EmbedRequest) -> Result<EmbedResponse, LlmError> {
            Ok(EmbedResponse { embeddings: vec![] })
        }
    }

    #[test]
    fn defaults_cover_all_builtin_tags() {
        let registry = ProviderRegistry::with_defaults();
        assert_eq!(
            registry.list_providers(),
            vec!["anthropic", "gemini", "ollama", "openai"]
        );
        assert!(registry.has_provider("gemini"));
        assert!(!registry.has_provider("mystery"));
    }

    #[test]
    fn unknown_tag_error_lists_known_tags() {
        let registry = ProviderRegistry::with_defaults();
        let config = ProviderConfig::new("mystery", "some-model");

        let error = registry
            .create(&config)
            .err()
            .expect("unknown tag should fail");
        assert_eq!(
            error.to_string(),
            "unknown provider: mystery (known providers: anthropic, gemini, ollama, openai)"
        );
    }

    #[test]
    fn create_returns_provider_matching_tag() {
        let registry = ProviderRegistry::with_defaults();
        let config = ProviderConfig::new("ollama", "llama3.1:8b");

        let provider = registry.create(&config).unwrap();
        assert_eq!(provider.name(), "ollama");
    }

    #[test]
    fn reregistering_a_tag_overrides_the_factory() {
        let mut registry = ProviderRegistry::with_defaults();
        registry.register("gemini", |_config| Ok(Arc::new(CannedProvider)));

        let config = ProviderConfig::new("gemini", "any");
        let provider = registry.create(&config).unwrap();
        assert_eq!(provider.name(), "canned");
    }
}
