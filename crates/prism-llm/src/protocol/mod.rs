//! Wire format types for backend-specific API protocols
//!
//! Each module contains pure serde structs matching the respective backend's
//! JSON API format. These types are only used for serialization and
//! deserialization at the boundary and are not used internally.

pub mod anthropic;
pub mod gemini;
pub mod ollama;
pub mod openai;
