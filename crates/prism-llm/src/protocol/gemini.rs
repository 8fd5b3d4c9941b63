//! Google Generative Language API wire format types

use serde::{Deserialize, Serialize};

// -- Request types --

/// Gemini `generateContent` request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest {
    /// Conversation contents
    pub contents: Vec<GeminiContent>,
    /// System instruction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<GeminiContent>,
    /// Generation configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GeminiGenerationConfig>,
    /// Tool definitions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<GeminiTool>>,
}

/// Gemini content object containing role and parts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiContent {
    /// Role ("user" or "model")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Content parts
    pub parts: Vec<GeminiPart>,
}

/// Individual part within a Gemini content object
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GeminiPart {
    /// Text content
    Text(String),
    /// Function call from the model
    FunctionCall(GeminiFunctionCall),
    /// Function response from the user
    FunctionResponse(GeminiFunctionResponse),
}

/// Function call from the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiFunctionCall {
    /// Function name
    pub name: String,
    /// Function arguments as JSON
    #[serde(default)]
    pub args: serde_json::Value,
}

/// Function response from the user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiFunctionResponse {
    /// Function name
    pub name: String,
    /// Response content as JSON
    pub response: serde_json::Value,
}

/// Generation configuration parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiGenerationConfig {
    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Nucleus sampling threshold
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// Maximum output tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

/// Gemini tool definition wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiTool {
    /// Function declarations
    pub function_declarations: Vec<GeminiFunctionDeclaration>,
}

/// Gemini function declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiFunctionDeclaration {
    /// Function name
    pub name: String,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema for parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
}

// -- Response types --

/// Gemini `generateContent` response
///
/// Streaming chunks are full responses of this shape, one per SSE event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiResponse {
    /// Generated candidates
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
}

/// Generated candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiCandidate {
    /// Generated content
    pub content: GeminiContent,
    /// Finish reason
    #[serde(default)]
    pub finish_reason: Option<String>,
}

// -- Token counting --

/// Gemini `countTokens` request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiCountRequest {
    /// Contents to count
    pub contents: Vec<GeminiContent>,
}

/// Gemini `countTokens` response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiCountResponse {
    /// Total token count
    pub total_tokens: u32,
}

// -- Embeddings --

/// Entry in a `batchEmbedContents` request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiEmbedEntry {
    /// Fully-qualified model name ("models/...")
    pub model: String,
    /// Content to embed
    pub content: GeminiContent,
}

/// Gemini `batchEmbedContents` request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiBatchEmbedRequest {
    /// One entry per input text
    pub requests: Vec<GeminiEmbedEntry>,
}

/// Gemini `batchEmbedContents` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiBatchEmbedResponse {
    /// One embedding per input
    #[serde(default)]
    pub embeddings: Vec<GeminiEmbedding>,
}

/// A single embedding vector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiEmbedding {
    /// Embedding values
    pub values: Vec<f32>,
}
