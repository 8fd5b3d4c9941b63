//! Provider abstraction core for Prism
//!
//! Provides a unified interface over multiple LLM backends (Gemini, `OpenAI`,
//! Anthropic, Ollama) with bidirectional wire-format conversion, streaming
//! reassembly, and a tag-keyed provider registry.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod convert;
pub mod error;
pub mod protocol;
pub mod provider;
pub mod registry;
pub mod stream;
pub mod types;

pub use error::LlmError;
pub use provider::{Provider, ResponseStream};
pub use registry::ProviderRegistry;
pub use types::{EmbedRequest, EmbedResponse, GenerateRequest, GenerateResponse, TokenCount};
