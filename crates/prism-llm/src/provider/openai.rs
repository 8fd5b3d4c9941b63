//! OpenAI-compatible provider implementation

use async_trait::async_trait;
use futures_util::StreamExt;
use prism_config::ProviderConfig;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use super::{Provider, ResponseStream, check_status, transport_error};
use crate::convert::openai::{OpenAiStreamState, openai_response_to_generate};
use crate::error::LlmError;
use crate::protocol::openai::{
    OpenAiEmbeddingRequest, OpenAiEmbeddingResponse, OpenAiRequest, OpenAiResponse,
    OpenAiStreamChunk,
};
use crate::stream::{Framing, StreamFrame, json_records};
use crate::types::{
    ContentEmbedding, EmbedRequest, EmbedResponse, GenerateRequest, GenerateResponse, TokenCount,
    estimate_tokens,
};

/// Default `OpenAI` API base URL
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI-compatible provider
///
/// Also fronts third-party endpoints that speak the chat-completions
/// protocol, selected via `base_url` in the configuration.
pub struct OpenAiProvider {
    client: Client,
    base_url: Url,
    api_key: Option<SecretString>,
    model: String,
}

impl OpenAiProvider {
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

    /// Build an endpoint URL under the configured base
    fn endpoint_url(&self, path: &str) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        format!("{base}/{path}")
    }

    /// POST a JSON body with bearer authentication
    async fn post_json<T: serde::Serialize + Sync>(
        &self,
        url: &str,
        body: &T,
    ) -> Result<reqwest::Response, LlmError> {
        let mut builder = self.client.post(url).json(body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| transport_error(self.name(), &e))?;
        check_status(self.name(), response).await
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
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
        let mut wire_request: OpenAiRequest = request.into();
        wire_request.model = self.model.clone();

        let response = self
            .post_json(&self.endpoint_url("chat/completions"), &wire_request)
            .await?;

        let wire_response: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Transport(format!("failed to decode response body: {e}")))?;

        openai_response_to_generate(wire_response)
    }

    async fn generate_content_stream(
        &self,
        request: &GenerateRequest,
    ) -> Result<ResponseStream, LlmError> {
        let mut wire_request: OpenAiRequest = request.into();
        wire_request.model = self.model.clone();
        wire_request.stream = Some(true);

        let response = self
            .post_json(&self.endpoint_url("chat/completions"), &wire_request)
            .await?;

        let frames = json_records(response.bytes_stream(), Framing::EventStream);
        let mut state = OpenAiStreamState::new();
        Ok(super::terminated(frames.map(move |frame| match frame {
            Ok(StreamFrame::Record(data)) => {
                match serde_json::from_str::<OpenAiStreamChunk>(&data) {
                    Ok(chunk) => state
                        .absorb_chunk(&chunk)
                        .into_iter()
                        .map(|delta| Some(Ok(delta)))
                        .collect(),
                    Err(e) => {
                        tracing::debug!(error = %e, data = %data, "skipping unparseable chunk");
                        vec![]
                    }
                }
            }
            // The sentinel ends the stream regardless of connection state
            Ok(StreamFrame::Done) => {
                let mut items: Vec<_> = match state.finish() {
                    Ok(last) => last.into_iter().map(|r| Some(Ok(r))).collect(),
                    Err(e) => vec![Some(Err(e))],
                };
                items.push(None);
                items
            }
            Err(e) => vec![Some(Err(e))],
        })))
    }

    async fn count_tokens(&self, request: &GenerateRequest) -> Result<TokenCount, LlmError> {
        Ok(TokenCount {
            total_tokens: estimate_tokens(&request.flattened_text()),
        })
    }

    async fn embed_content(&self, request: &EmbedRequest) -> Result<EmbedResponse, LlmError> {
        let wire_request = OpenAiEmbeddingRequest {
            model: self.model.clone(),
            input: request.texts.clone(),
        };

        let response = self
            .post_json(&self.endpoint_url("embeddings"), &wire_request)
            .await?;

        let wire_response: OpenAiEmbeddingResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Transport(format!("failed to decode response body: {e}")))?;

        Ok(EmbedResponse {
            embeddings: wire_response
                .data
                .into_iter()
                .map(|d| ContentEmbedding {
                    values: d.embedding,
                })
                .collect(),
        })
    }
}
