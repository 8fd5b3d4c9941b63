use http::StatusCode;
use thiserror::Error;

/// Errors that can occur during LLM operations
#[derive(Debug, Error)]
pub enum LlmError {
    /// Requested provider tag is not registered
    #[error("unknown provider: {provider} (known providers: {known})")]
    UnknownProvider {
        /// The tag that was requested
        provider: String,
        /// Comma-separated list of registered tags
        known: String,
    },

    /// Upstream backend returned a non-2xx response
    #[error("provider returned {status}: {message}")]
    Upstream {
        /// HTTP status from the backend
        status: StatusCode,
        /// Backend status text / error body
        message: String,
    },

    /// Request could not be sent to the backend
    #[error("request to provider failed: {0}")]
    Transport(String),

    /// Error during streaming response
    #[error("streaming error: {0}")]
    Streaming(String),

    /// Tool-call arguments were present but not valid JSON
    #[error("malformed tool call arguments: {0}")]
    ToolArguments(String),

    /// Request could not be translated to the backend wire format
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Unexpected internal error
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl LlmError {
    /// Build an upstream error from a status code and backend body
    pub fn upstream(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            message: message.into(),
        }
    }

    /// Whether this error originated from the backend rather than locally
    ///
    /// Retry policy belongs to the caller; this only classifies the source.
    pub const fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::Upstream { .. } | Self::Transport(_) | Self::Streaming(_) | Self::ToolArguments(_)
        )
    }
}
