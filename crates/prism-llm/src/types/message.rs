use serde::{Deserialize, Serialize};

/// Role of a content entry in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// End-user input
    User,
    /// Model output (mapped to "assistant" on most backends)
    Model,
}

impl Role {
    /// Parse a role string; unrecognized or absent roles default to user
    pub fn from_str_lossy(role: Option<&str>) -> Self {
        match role {
            Some("model" | "assistant") => Self::Model,
            _ => Self::User,
        }
    }
}

/// One entry in a conversation: a role plus ordered parts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    /// Role of the entry's author
    pub role: Role,
    /// Ordered content parts
    pub parts: Vec<Part>,
}

impl Content {
    /// Create a user text entry
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::Text(text.into())],
        }
    }

    /// Create a model text entry
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            parts: vec![Part::Text(text.into())],
        }
    }

    /// Create a model entry carrying a function call
    pub fn function_call(name: impl Into<String>, args: serde_json::Value) -> Self {
        Self {
            role: Role::Model,
            parts: vec![Part::FunctionCall(FunctionCall {
                name: name.into(),
                args,
            })],
        }
    }

    /// Create a user entry carrying a function response
    pub fn function_response(name: impl Into<String>, response: serde_json::Value) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::FunctionResponse(FunctionResponse {
                name: name.into(),
                response,
            })],
        }
    }

    /// Concatenate all text parts in order
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// All function-call parts in order
    pub fn function_calls(&self) -> impl Iterator<Item = &FunctionCall> {
        self.parts.iter().filter_map(|p| match p {
            Part::FunctionCall(call) => Some(call),
            _ => None,
        })
    }

    /// All function-response parts in order
    pub fn function_responses(&self) -> impl Iterator<Item = &FunctionResponse> {
        self.parts.iter().filter_map(|p| match p {
            Part::FunctionResponse(resp) => Some(resp),
            _ => None,
        })
    }
}

/// Individual part within a content entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Part {
    /// Freeform text
    Text(String),
    /// Function call requested by the model
    FunctionCall(FunctionCall),
    /// Result of a function invocation, supplied by the caller
    FunctionResponse(FunctionResponse),
}

/// A structured request from the model to invoke a function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Function name
    pub name: String,
    /// Parsed function arguments
    pub args: serde_json::Value,
}

/// Result of a function invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponse {
    /// Name of the function that produced this result
    pub name: String,
    /// Result payload
    pub response: serde_json::Value,
}
