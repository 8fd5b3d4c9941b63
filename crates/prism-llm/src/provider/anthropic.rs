//! Anthropic Messages API provider implementation

use async_trait::async_trait;
use futures_util::StreamExt;
use prism_config::ProviderConfig;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use super::{Provider, ResponseStream, check_status, transport_error};
use crate::convert::anthropic::{AnthropicStep, AnthropicStreamState};
use crate::error::LlmError;
use crate::protocol::anthropic::{AnthropicRequest, AnthropicResponse, AnthropicStreamEvent};
use crate::stream::{Framing, StreamFrame, json_records};
use crate::types::{
    EmbedRequest, EmbedResponse, GenerateRequest, GenerateResponse, TokenCount, estimate_tokens,
};

/// Default Anthropic API base URL
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";

/// Version header value required by the Messages API
const API_VERSION: &str = "2023-06-01";

/// Anthropic-compatible provider
pub struct AnthropicProvider {
    client: Client,
    base_url: Url,
    api_key: Option<SecretString>,
    model: String,
}

impl AnthropicProvider {
    /// Create from provider configuration
    ///
    /// # Panics
    ///
    /// Panics if the hardcoded default base URL is invalid (should never happen).
    pub fn new(config: &ProviderConfig) -> Self {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| Url::parse(DEFAULT_BASE_URL).expect("valid default URL"));

        Self {
            client: Client::new(),
            base_url,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    /// Build the messages endpoint URL
    fn messages_url(&self) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        format!("{base}/messages")
    }

    /// POST a request with the `x-api-key` and version headers
    async fn post_messages(
        &self,
        wire_request: &AnthropicRequest,
    ) -> Result<reqwest::Response, LlmError> {
        let mut builder = self
            .client
            .post(self.messages_url())
            .header("anthropic-version", API_VERSION)
            .json(wire_request);
        if let Some(key) = &self.api_key {
            builder = builder.header("x-api-key", key.expose_secret());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| transport_error(self.name(), &e))?;
        check_status(self.name(), response).await
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    fn validate_config(&self, config: &ProviderConfig) -> bool {
        config.provider == self.name()
            && !config.model.is_empty()
            && config
                .api_key
                .as_ref()
                .is_some_and(|k| !k.expose_secret().is_empty())
    }

    async fn generate_content(
        &self,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse, LlmError> {
        let mut wire_request: AnthropicRequest = request.into();
        wire_request.model = self.model.clone();

        let response = self.post_messages(&wire_request).await?;

        let wire_response: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Transport(format!("failed to decode response body: {e}")))?;

        Ok(wire_response.into())
    }

    async fn generate_content_stream(
        &self,
        request: &GenerateRequest,
    ) -> Result<ResponseStream, LlmError> {
        let mut wire_request: AnthropicRequest = request.into();
        wire_request.model = self.model.clone();
        wire_request.stream = Some(true);

        let response = self.post_messages(&wire_request).await?;

        let frames = json_records(response.bytes_stream(), Framing::EventStream);
        let mut state = AnthropicStreamState::new();
        Ok(super::terminated(frames.map(move |frame| match frame {
            Ok(StreamFrame::Record(data)) => {
                match serde_json::from_str::<AnthropicStreamEvent>(&data) {
                    Ok(event) => match state.convert_event(event) {
                        Ok(AnthropicStep::None) => vec![],
                        Ok(AnthropicStep::Emit(partial)) => vec![Some(Ok(partial))],
                        // message_stop ends the stream regardless of connection state
                        Ok(AnthropicStep::Finished(last)) => {
                            let mut items: Vec<_> =
                                last.into_iter().map(|r| Some(Ok(r))).collect();
                            items.push(None);
                            items
                        }
                        Err(e) => vec![Some(Err(e))],
                    },
                    Err(e) => {
                        tracing::debug!(error = %e, data = %data, "skipping unparseable event");
                        vec![]
                    }
                }
            }
            // The Messages API signals completion with message_stop, not a sentinel
            Ok(StreamFrame::Done) => vec![None],
            Err(e) => vec![Some(Err(e))],
        })))
    }

    async fn count_tokens(&self, request: &GenerateRequest) -> Result<TokenCount, LlmError> {
        Ok(TokenCount {
            total_tokens: estimate_tokens(&request.flattened_text()),
        })
    }

    async fn embed_content(&self, _request: &EmbedRequest) -> Result<EmbedResponse, LlmError> {
        // No embeddings endpoint exists; unsupported is not a failure
        tracing::debug!(provider = self.name(), "embeddings not supported, returning empty");
        Ok(EmbedResponse { embeddings: vec![] })
    }
}
