//! Ollama chat API wire format types

use serde::{Deserialize, Serialize};

// -- Request types --

/// Ollama `/api/chat` request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaChatRequest {
    /// Model identifier (e.g. "llama3.1:8b")
    pub model: String,
    /// Conversation messages
    pub messages: Vec<OllamaMessage>,
    /// Tool definitions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<OllamaTool>>,
    /// Whether to stream the response
    pub stream: bool,
    /// Model runtime options
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<OllamaOptions>,
}

/// Model runtime options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaOptions {
    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Nucleus sampling threshold
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// Maximum tokens to predict
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<u32>,
}

/// Ollama chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaMessage {
    /// Role ("system", "user", "assistant", "tool")
    pub role: String,
    /// Message text
    #[serde(default)]
    pub content: String,
    /// Tool calls made by the assistant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<OllamaToolCall>>,
    /// Name of the tool a "tool" role message responds to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

/// A tool call in an Ollama message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaToolCall {
    /// Function name and pre-parsed arguments
    pub function: OllamaFunctionCall,
}

/// Function payload of an Ollama tool call
///
/// Unlike `OpenAI`, Ollama delivers arguments as a parsed JSON object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaFunctionCall {
    /// Function name
    pub name: String,
    /// Function arguments as JSON
    #[serde(default)]
    pub arguments: serde_json::Value,
}

/// Ollama tool definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaTool {
    /// Always "function"
    #[serde(rename = "type")]
    pub tool_type: String,
    /// Function specification
    pub function: OllamaFunctionDef,
}

/// Function specification within a tool definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaFunctionDef {
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

/// Ollama `/api/chat` response
///
/// When streaming, each NDJSON line is one object of this shape; the final
/// line has `done: true`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaChatResponse {
    /// Generated (or incremental) message
    pub message: OllamaMessage,
    /// Whether generation has finished
    #[serde(default)]
    pub done: bool,
    /// Why generation stopped (present when done)
    #[serde(default)]
    pub done_reason: Option<String>,
}

// -- Embeddings --

/// Ollama `/api/embed` request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaEmbedRequest {
    /// Model identifier
    pub model: String,
    /// Input texts
    pub input: Vec<String>,
}

/// Ollama `/api/embed` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaEmbedResponse {
    /// One embedding per input text
    #[serde(default)]
    pub embeddings: Vec<Vec<f32>>,
}
