//! Bidirectional conversion between canonical types and wire formats
//!
//! Each submodule handles conversions for a specific backend's protocol,
//! including the per-backend streaming accumulator state.

pub mod anthropic;
pub mod gemini;
pub mod ollama;
pub mod openai;
