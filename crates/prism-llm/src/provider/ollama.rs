//! Ollama local provider implementation

use async_trait::async_trait;
use futures_util::StreamExt;
use prism_config::ProviderConfig;
use reqwest::Client;
use url::Url;

use super::{Provider, ResponseStream, check_status, transport_error};
use crate::convert::ollama::{OllamaStep, OllamaStreamState};
use crate::error::LlmError;
use crate::protocol::ollama::{
    OllamaChatRequest, OllamaChatResponse, OllamaEmbedRequest, OllamaEmbedResponse,
};
use crate::stream::{Framing, StreamFrame, json_records};
use crate::types::{
    ContentEmbedding, EmbedRequest, EmbedResponse, GenerateRequest, GenerateResponse, TokenCount,
    estimate_tokens,
};

/// Default Ollama daemon address
const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Local Ollama provider
///
/// Talks to a local daemon over NDJSON-framed streaming; no authentication.
pub struct OllamaProvider {
    client: Client,
    base_url: Url,
    model: String,
}

impl OllamaProvider {
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
            model: config.model.clone(),
        }
    }

    /// Build an endpoint URL under the configured base
    fn endpoint_url(&self, path: &str) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        format!("{base}/{path}")
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &'static str {
        "ollama"
    }

    fn validate_config(&self, config: &ProviderConfig) -> bool {
        // No API key needed for a local daemon
        config.provider == self.name() && !config.model.is_empty()
    }

    async fn generate_content(
        &self,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse, LlmError> {
        let mut wire_request: OllamaChatRequest = request.into();
        wire_request.model = self.model.clone();

        let response = self
            .client
            .post(self.endpoint_url("api/chat"))
            .json(&wire_request)
            .send()
            .await
            .map_err(|e| transport_error(self.name(), &e))?;
        let response = check_status(self.name(), response).await?;

        let wire_response: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Transport(format!("failed to decode response body: {e}")))?;

        Ok(wire_response.into())
    }

    async fn generate_content_stream(
        &self,
        request: &GenerateRequest,
    ) -> Result<ResponseStream, LlmError> {
        let mut wire_request: OllamaChatRequest = request.into();
        wire_request.model = self.model.clone();
        wire_request.stream = true;

        let response = self
            .client
            .post(self.endpoint_url("api/chat"))
            .json(&wire_request)
            .send()
            .await
            .map_err(|e| transport_error(self.name(), &e))?;
        let response = check_status(self.name(), response).await?;

        let frames = json_records(response.bytes_stream(), Framing::NdJson);
        let mut state = OllamaStreamState::new();
        Ok(super::terminated(frames.map(move |frame| match frame {
            Ok(StreamFrame::Record(data)) => {
                match serde_json::from_str::<OllamaChatResponse>(&data) {
                    Ok(chunk) => match state.absorb_chunk(chunk) {
                        OllamaStep::None => vec![],
                        OllamaStep::Emit(partial) => vec![Some(Ok(partial))],
                        // The done flag ends the stream regardless of connection state
                        OllamaStep::Finished(last) => {
                            let mut items: Vec<_> =
                                last.into_iter().map(|r| Some(Ok(r))).collect();
                            items.push(None);
                            items
                        }
                    },
                    Err(e) => {
                        tracing::debug!(error = %e, data = %data, "skipping unparseable line");
                        vec![]
                    }
                }
            }
            // NDJSON framing has no sentinel
            Ok(StreamFrame::Done) => vec![None],
            Err(e) => vec![Some(Err(e))],
        })))
    }

    async fn count_tokens(&self, request: &GenerateRequest) -> Result<TokenCount, LlmError> {
        Ok(TokenCount {
            total_tokens: estimate_tokens(&request.flattened_text()),
        })
    }

    async fn embed_content(&self, request: &EmbedRequest) -> Result<EmbedResponse, LlmError> {
        let wire_request = OllamaEmbedRequest {
            model: self.model.clone(),
            input: request.texts.clone(),
        };

        let response = self
            .client
            .post(self.endpoint_url("api/embed"))
            .json(&wire_request)
            .send()
            .await
            .map_err(|e| transport_error(self.name(), &e))?;
        let response = check_status(self.name(), response).await?;

        let wire_response: OllamaEmbedResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Transport(format!("failed to decode response body: {e}")))?;

        Ok(EmbedResponse {
            embeddings: wire_response
                .embeddings
                .into_iter()
                .map(|values| ContentEmbedding { values })
                .collect(),
        })
    }
}
