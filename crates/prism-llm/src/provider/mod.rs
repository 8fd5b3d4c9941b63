//! Provider trait and implementations for LLM backends

pub mod anthropic;
pub mod gemini;
pub mod ollama;
pub mod openai;

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use prism_config::ProviderConfig;

use crate::error::LlmError;
use crate::types::{
    EmbedRequest, EmbedResponse, GenerateRequest, GenerateResponse, TokenCount,
};

pub use anthropic::AnthropicProvider;
pub use gemini::GeminiProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

/// Stream of partial responses from a streaming generation call
///
/// Elements arrive as the backend produces them; dropping the stream
/// releases the underlying response body.
pub type ResponseStream = Pin<Box<dyn Stream<Item = Result<GenerateResponse, LlmError>> + Send>>;

/// Trait implemented by each LLM provider backend
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider tag ("gemini", "openai", "anthropic", "ollama")
    fn name(&self) -> &'static str;

    /// Whether a configuration is usable with this provider
    ///
    /// Checks the tag and required fields only; no network calls.
    fn validate_config(&self, config: &ProviderConfig) -> bool;

    /// Send a non-streaming generation request
    async fn generate_content(
        &self,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse, LlmError>;

    /// Send a streaming generation request
    ///
    /// Text deltas are emitted as they arrive; backends that stream tool
    /// calls in fragments emit them reassembled in one final element.
    async fn generate_content_stream(
        &self,
        request: &GenerateRequest,
    ) -> Result<ResponseStream, LlmError>;

    /// Count the tokens a request would consume
    async fn count_tokens(&self, request: &GenerateRequest) -> Result<TokenCount, LlmError>;

    /// Embed a batch of texts
    async fn embed_content(&self, request: &EmbedRequest) -> Result<EmbedResponse, LlmError>;
}

/// Per-frame output of a streaming chunk handler
///
/// `None` marks the in-band end of the stream (sentinel, stop event, or
/// done flag); mapping stops there so the response body is released even
/// when the backend keeps the connection open afterwards.
type FrameOutput = Vec<Option<Result<GenerateResponse, LlmError>>>;

/// Flatten chunk-handler output into a response stream that ends at the
/// terminal marker instead of waiting for the connection to close
fn terminated<S>(frames: S) -> ResponseStream
where
    S: Stream<Item = FrameOutput> + Send + 'static,
{
    Box::pin(
        frames
            .flat_map(futures_util::stream::iter)
            .take_while(|item| futures_util::future::ready(item.is_some()))
            .filter_map(futures_util::future::ready),
    )
}

/// Fail on a non-2xx upstream response, capturing the error body
///
/// Success passes the response through untouched for the caller to consume.
async fn check_status(
    provider: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, LlmError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    tracing::warn!(provider, status = %status, "upstream returned error");
    Err(LlmError::upstream(status, body))
}

/// Map a reqwest send failure to a transport error
fn transport_error(provider: &str, error: &reqwest::Error) -> LlmError {
    tracing::error!(provider, error = %error, "upstream request failed");
    LlmError::Transport(error.to_string())
}
