//! Canonical types for LLM request/response representation
//!
//! These types are provider-agnostic and serve as the normalized vocabulary
//! that all wire formats convert to and from. The shape follows the
//! contents/parts model: a conversation is an ordered list of role-tagged
//! content entries, each holding text, function-call, or function-response
//! parts.

pub mod message;
pub mod request;
pub mod response;

pub use message::{Content, FunctionCall, FunctionResponse, Part, Role};
pub use request::{EmbedRequest, FunctionDeclaration, GenerateRequest, GenerationConfig};
pub use response::{
    Candidate, ContentEmbedding, EmbedResponse, GenerateResponse, TokenCount, estimate_tokens,
};
