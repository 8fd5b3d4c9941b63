//! Gemini (Google Generative Language API) provider implementation

use futures_util::StreamExt;
use prism_config::ProviderConfig;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use async_trait::async_trait;

use super::{Provider, ResponseStream, check_status, transport_error};
use crate::convert::gemini::gemini_chunk_to_response;
use crate::error::LlmError;
use crate::protocol::gemini::{
    GeminiBatchEmbedRequest, GeminiBatchEmbedResponse, GeminiContent, GeminiCountRequest,
    GeminiCountResponse, GeminiEmbedEntry, GeminiPart, GeminiRequest, GeminiResponse,
};
use crate::stream::{Framing, StreamFrame, json_records};
use crate::types::{
    ContentEmbedding, EmbedRequest, EmbedResponse, GenerateRequest, GenerateResponse, TokenCount,
};

/// Default Generative Language API base URL
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini provider, the cloud default
pub struct GeminiProvider {
    client: Client,
    base_url: Url,
    api_key: Option<SecretString>,
    model: String,
}

impl GeminiProvider {
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

    /// Build a model-scoped endpoint URL, appending the API key
    fn endpoint_url(&self, verb: &str, query_prefix: &str) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        let mut url = format!("{base}/models/{model}:{verb}", model = self.model);
        url.push_str(query_prefix);
        if let Some(key) = &self.api_key {
            use std::fmt::Write;
            let sep = if query_prefix.is_empty() { '?' } else { '&' };
            let _ = write!(url, "{sep}key={key}", key = key.expose_secret());
        }
        url
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
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
        let wire_request: GeminiRequest = request.into();
        let url = self.endpoint_url("generateContent", "");

        let response = self
            .client
            .post(&url)
            .json(&wire_request)
            .send()
            .await
            .map_err(|e| transport_error(self.name(), &e))?;
        let response = check_status(self.name(), response).await?;

        let wire_response: GeminiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Transport(format!("failed to decode response body: {e}")))?;

        Ok(wire_response.into())
    }

    async fn generate_content_stream(
        &self,
        request: &GenerateRequest,
    ) -> Result<ResponseStream, LlmError> {
        let wire_request: GeminiRequest = request.into();
        let url = self.endpoint_url("streamGenerateContent", "?alt=sse");

        let response = self
            .client
            .post(&url)
            .json(&wire_request)
            .send()
            .await
            .map_err(|e| transport_error(self.name(), &e))?;
        let response = check_status(self.name(), response).await?;

        let frames = json_records(response.bytes_stream(), Framing::EventStream);
        Ok(super::terminated(frames.map(|frame| match frame {
            Ok(StreamFrame::Record(data)) => {
                match serde_json::from_str::<GeminiResponse>(&data) {
                    Ok(chunk) => gemini_chunk_to_response(chunk)
                        .into_iter()
                        .map(|partial| Some(Ok(partial)))
                        .collect(),
                    Err(e) => {
                        tracing::debug!(error = %e, data = %data, "skipping unparseable chunk");
                        vec![]
                    }
                }
            }
            // Gemini streams have no sentinel; end on one anyway if it appears
            Ok(StreamFrame::Done) => vec![None],
            Err(e) => vec![Some(Err(e))],
        })))
    }

    async fn count_tokens(&self, request: &GenerateRequest) -> Result<TokenCount, LlmError> {
        let contents = GeminiRequest::from(request).contents;
        let url = self.endpoint_url("countTokens", "");

        let response = self
            .client
            .post(&url)
            .json(&GeminiCountRequest { contents })
            .send()
            .await
            .map_err(|e| transport_error(self.name(), &e))?;
        let response = check_status(self.name(), response).await?;

        let counted: GeminiCountResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Transport(format!("failed to decode response body: {e}")))?;

        Ok(TokenCount {
            total_tokens: counted.total_tokens,
        })
    }

    async fn embed_content(&self, request: &EmbedRequest) -> Result<EmbedResponse, LlmError> {
        let requests = request
            .texts
            .iter()
            .map(|text| GeminiEmbedEntry {
                model: format!("models/{model}", model = self.model),
                content: GeminiContent {
                    role: None,
                    parts: vec![GeminiPart::Text(text.clone())],
                },
            })
            .collect();
        let url = self.endpoint_url("batchEmbedContents", "");

        let response = self
            .client
            .post(&url)
            .json(&GeminiBatchEmbedRequest { requests })
            .send()
            .await
            .map_err(|e| transport_error(self.name(), &e))?;
        let response = check_status(self.name(), response).await?;

        let wire_response: GeminiBatchEmbedResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Transport(format!("failed to decode response body: {e}")))?;

        Ok(EmbedResponse {
            embeddings: wire_response
                .embeddings
                .into_iter()
                .map(|e| ContentEmbedding { values: e.values })
                .collect(),
        })
    }
}
