//! Conversion between canonical types and the Ollama wire format

use crate::protocol::ollama::{
    OllamaChatRequest, OllamaChatResponse, OllamaFunctionCall, OllamaFunctionDef, OllamaMessage,
    OllamaOptions, OllamaTool, OllamaToolCall,
};
use crate::types::{Content, FunctionCall, GenerateRequest, GenerateResponse, Part, Role};

// -- Outbound: canonical request -> Ollama wire request --

impl From<&GenerateRequest> for OllamaChatRequest {
    fn from(req: &GenerateRequest) -> Self {
        let mut messages = Vec::new();

        // Ollama takes the system prompt as a leading system-role message
        if let Some(system) = &req.system_instruction {
            messages.push(OllamaMessage {
                role: "system".to_owned(),
                content: system.clone(),
                tool_calls: None,
                tool_name: None,
            });
        }

        for content in &req.contents {
            messages.extend(internal_content_to_ollama(content));
        }

        let tools = req.tools.as_ref().map(|tools| {
            tools
                .iter()
                .map(|t| OllamaTool {
                    tool_type: "function".to_owned(),
                    function: OllamaFunctionDef {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        parameters: t.parameters.clone(),
                    },
                })
                .collect()
        });

        let config = &req.generation_config;
        let options = if config.temperature.is_none()
            && config.top_p.is_none()
            && config.max_output_tokens.is_none()
        {
            None
        } else {
            Some(OllamaOptions {
                temperature: config.temperature,
                top_p: config.top_p,
                num_predict: config.max_output_tokens,
            })
        };

        Self {
            model: String::new(),
            messages,
            tools,
            stream: false,
            options,
        }
    }
}

/// Convert one canonical content entry into zero or more Ollama messages
fn internal_content_to_ollama(content: &Content) -> Vec<OllamaMessage> {
    let responses: Vec<&crate::types::FunctionResponse> = content.function_responses().collect();
    if !responses.is_empty() {
        return responses
            .into_iter()
            .map(|resp| OllamaMessage {
                role: "tool".to_owned(),
                content: resp.response.to_string(),
                tool_calls: None,
                tool_name: Some(resp.name.clone()),
            })
            .collect();
    }

    let role = match content.role {
        Role::Model => "assistant",
        Role::User => "user",
    };
    let text = content.text();

    let calls: Vec<&FunctionCall> = content.function_calls().collect();
    if !calls.is_empty() {
        let tool_calls = calls
            .into_iter()
            .map(|call| OllamaToolCall {
                function: OllamaFunctionCall {
                    name: call.name.clone(),
                    arguments: call.args.clone(),
                },
            })
            .collect();

        return vec![OllamaMessage {
            role: "assistant".to_owned(),
            content: text,
            tool_calls: Some(tool_calls),
            tool_name: None,
        }];
    }

    if text.trim().is_empty() {
        return Vec::new();
    }

    vec![OllamaMessage {
        role: role.to_owned(),
        content: text,
        tool_calls: None,
        tool_name: None,
    }]
}

// -- Inbound: Ollama wire response -> canonical --

impl From<OllamaChatResponse> for GenerateResponse {
    fn from(resp: OllamaChatResponse) -> Self {
        let mut parts = Vec::new();

        if !resp.message.content.is_empty() {
            parts.push(Part::Text(resp.message.content));
        }

        for call in resp.message.tool_calls.unwrap_or_default() {
            parts.push(Part::FunctionCall(normalize_call(call)));
        }

        Self::from_parts(parts, resp.done_reason)
    }
}

/// Ollama supplies pre-parsed argument objects; an absent field is `{}`
fn normalize_call(call: OllamaToolCall) -> FunctionCall {
    let args = if call.function.arguments.is_null() {
        serde_json::json!({})
    } else {
        call.function.arguments
    };
    FunctionCall {
        name: call.function.name,
        args,
    }
}

// -- Stream conversion --

/// What one decoded Ollama NDJSON record produced
#[derive(Debug)]
pub enum OllamaStep {
    /// Nothing to emit
    None,
    /// An immediate text delta
    Emit(GenerateResponse),
    /// The done record was seen; payload is the deferred tool-call element
    Finished(Option<GenerateResponse>),
}

/// Accumulator for a streamed Ollama chat response
///
/// Text deltas pass through immediately; tool calls accumulate and flush
/// in the final element once the record carrying `done: true` arrives,
/// together with any text that record still carries.
#[derive(Debug, Default)]
pub struct OllamaStreamState {
    pending: Vec<FunctionCall>,
}

impl OllamaStreamState {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Absorb one NDJSON chunk
    pub fn absorb_chunk(&mut self, chunk: OllamaChatResponse) -> OllamaStep {
        for call in chunk.message.tool_calls.unwrap_or_default() {
            self.pending.push(normalize_call(call));
        }

        if chunk.done {
            let mut parts = Vec::new();
            if !chunk.message.content.is_empty() {
                parts.push(Part::Text(chunk.message.content));
            }
            parts.extend(std::mem::take(&mut self.pending).into_iter().map(Part::FunctionCall));

            if parts.is_empty() {
                return OllamaStep::Finished(None);
            }
            return OllamaStep::Finished(Some(GenerateResponse::from_parts(
                parts,
                chunk.done_reason,
            )));
        }

        if chunk.message.content.is_empty() {
            OllamaStep::None
        } else {
            OllamaStep::Emit(GenerateResponse::text_delta(chunk.message.content))
        }
    }
}
