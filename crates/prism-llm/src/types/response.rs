use serde::{Deserialize, Serialize};

use super::message::{Content, FunctionCall, Part, Role};

/// Finish reason used when the backend omits one
pub const DEFAULT_FINISH_REASON: &str = "stop";

/// A single generated candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// Generated content
    pub content: Content,
    /// Backend stop indicator, copied verbatim
    pub finish_reason: String,
}

/// Canonical content-generation response
///
/// `text` is always the concatenation of the text parts of the first
/// candidate, and `function_calls` the in-order extraction of its
/// function-call parts. Construct via [`GenerateResponse::from_parts`] to
/// keep those fields consistent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    /// Generated candidates
    pub candidates: Vec<Candidate>,
    /// Flattened primary text
    pub text: String,
    /// Function calls extracted from the first candidate, in order
    pub function_calls: Vec<FunctionCall>,
}

impl GenerateResponse {
    /// Build a response from model parts, deriving the flattened fields
    pub fn from_parts(parts: Vec<Part>, finish_reason: Option<String>) -> Self {
        let content = Content {
            role: Role::Model,
            parts,
        };
        let text = content.text();
        let function_calls = content.function_calls().cloned().collect();

        Self {
            candidates: vec![Candidate {
                content,
                finish_reason: finish_reason.unwrap_or_else(|| DEFAULT_FINISH_REASON.to_owned()),
            }],
            text,
            function_calls,
        }
    }

    /// Build a streaming text delta
    pub fn text_delta(text: impl Into<String>) -> Self {
        Self::from_parts(vec![Part::Text(text.into())], None)
    }

    /// Build the final streaming element carrying deferred function calls
    pub fn deferred_calls(calls: Vec<FunctionCall>, finish_reason: Option<String>) -> Self {
        let parts = calls.into_iter().map(Part::FunctionCall).collect();
        Self::from_parts(parts, finish_reason)
    }

    /// Whether this element carries function calls
    pub fn has_function_calls(&self) -> bool {
        !self.function_calls.is_empty()
    }
}

/// Result of a token-count request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenCount {
    /// Estimated or exact total tokens
    pub total_tokens: u32,
}

/// A single embedding vector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentEmbedding {
    /// Embedding values
    pub values: Vec<f32>,
}

/// Result of an embedding request
///
/// An empty `embeddings` sequence means the backend has no embedding
/// support, not that the request failed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmbedResponse {
    /// One embedding per input text, or empty when unsupported
    pub embeddings: Vec<ContentEmbedding>,
}

/// Character-based token estimate: `ceil(chars / 4)`
///
/// A rough approximation for backends without a native counting endpoint.
/// Callers must not treat the result as authoritative.
pub fn estimate_tokens(text: &str) -> u32 {
    let chars = u32::try_from(text.chars().count()).unwrap_or(u32::MAX);
    chars.div_ceil(4)
}
