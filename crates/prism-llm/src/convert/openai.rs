//! Conversion between canonical types and the `OpenAI` wire format

use crate::error::LlmError;
use crate::protocol::openai::{
    OpenAiFunction, OpenAiFunctionCall, OpenAiMessage, OpenAiRequest, OpenAiResponse,
    OpenAiStreamChunk, OpenAiTool, OpenAiToolCall,
};
use crate::types::response::DEFAULT_FINISH_REASON;
use crate::types::{Content, FunctionCall, GenerateRequest, GenerateResponse, Part, Role};

// -- Outbound: canonical request -> OpenAI wire request --

impl From<&GenerateRequest> for OpenAiRequest {
    fn from(req: &GenerateRequest) -> Self {
        let mut messages = Vec::new();

        // OpenAI has no top-level system field; prepend a system message
        if let Some(system) = &req.system_instruction {
            messages.push(OpenAiMessage {
                role: "system".to_owned(),
                content: Some(system.clone()),
                tool_calls: None,
                tool_call_id: None,
            });
        }

        for content in &req.contents {
            messages.extend(internal_content_to_openai(content));
        }

        let tools = req.tools.as_ref().map(|tools| {
            tools
                .iter()
                .map(|t| OpenAiTool {
                    tool_type: "function".to_owned(),
                    function: OpenAiFunction {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        parameters: t.parameters.clone(),
                    },
                })
                .collect()
        });

        Self {
            model: String::new(),
            messages,
            temperature: req.generation_config.temperature,
            top_p: req.generation_config.top_p,
            max_tokens: req.generation_config.max_output_tokens,
            stream: None,
            tools,
        }
    }
}

/// Convert one canonical content entry into zero or more `OpenAI` messages
///
/// Function-response parts each become their own "tool" message, correlated
/// by function name since the canonical model carries no tool-call id.
fn internal_content_to_openai(content: &Content) -> Vec<OpenAiMessage> {
    let responses: Vec<&crate::types::FunctionResponse> = content.function_responses().collect();
    if !responses.is_empty() {
        return responses
            .into_iter()
            .map(|resp| OpenAiMessage {
                role: "tool".to_owned(),
                content: Some(resp.response.to_string()),
                tool_calls: None,
                tool_call_id: Some(resp.name.clone()),
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
            .map(|call| OpenAiToolCall {
                id: call.name.clone(),
                tool_type: "function".to_owned(),
                function: OpenAiFunctionCall {
                    name: call.name.clone(),
                    arguments: call.args.to_string(),
                },
            })
            .collect();

        return vec![OpenAiMessage {
            role: "assistant".to_owned(),
            content: if text.is_empty() { None } else { Some(text) },
            tool_calls: Some(tool_calls),
            tool_call_id: None,
        }];
    }

    if text.trim().is_empty() {
        return Vec::new();
    }

    vec![OpenAiMessage {
        role: role.to_owned(),
        content: Some(text),
        tool_calls: None,
        tool_call_id: None,
    }]
}

/// Parse an `OpenAI` JSON-encoded arguments string
///
/// An absent or empty field decodes to `{}`; a present-but-invalid payload
/// is an upstream-class error rather than a silent fallback.
pub fn parse_arguments(raw: &str) -> Result<serde_json::Value, LlmError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(serde_json::json!({}));
    }
    serde_json::from_str(trimmed)
        .map_err(|e| LlmError::ToolArguments(format!("{e} in {trimmed:?}")))
}

// -- Inbound: OpenAI wire response -> canonical --

/// Convert a non-streaming `OpenAI` response into the canonical shape
pub fn openai_response_to_generate(resp: OpenAiResponse) -> Result<GenerateResponse, LlmError> {
    let Some(choice) = resp.choices.into_iter().next() else {
        return Ok(GenerateResponse::from_parts(Vec::new(), None));
    };

    let mut parts = Vec::new();

    if let Some(content) = choice.message.content
        && !content.is_empty()
    {
        parts.push(Part::Text(content));
    }

    for call in choice.message.tool_calls.unwrap_or_default() {
        let args = parse_arguments(&call.function.arguments)?;
        parts.push(Part::FunctionCall(FunctionCall {
            name: call.function.name,
            args,
        }));
    }

    Ok(GenerateResponse::from_parts(parts, choice.finish_reason))
}

// -- Stream conversion --

/// Upper bound on concurrently-assembled streaming tool calls
///
/// The wire index is attacker-controlled; slots are allocated per index, so
/// anything past this bound is ignored rather than grown into.
const MAX_PARALLEL_TOOL_CALLS: usize = 64;

/// Accumulator for a streamed `OpenAI` completion
///
/// Text deltas are emitted as they arrive; tool-call fragments are keyed by
/// their wire index and only flushed as canonical function calls once the
/// terminal sentinel is seen.
#[derive(Debug, Default)]
pub struct OpenAiStreamState {
    pending: Vec<PendingToolCall>,
    finish_reason: Option<String>,
}

#[derive(Debug, Default)]
struct PendingToolCall {
    name: String,
    arguments: String,
}

impl OpenAiStreamState {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Absorb one stream chunk, returning an immediate text delta if any
    pub fn absorb_chunk(&mut self, chunk: &OpenAiStreamChunk) -> Option<GenerateResponse> {
        let mut text = String::new();

        for choice in &chunk.choices {
            if let Some(content) = &choice.delta.content {
                text.push_str(content);
            }

            for fragment in choice.delta.tool_calls.iter().flatten() {
                let index = fragment.index as usize;
                if index >= MAX_PARALLEL_TOOL_CALLS {
                    tracing::debug!(index, "ignoring out-of-range tool call index");
                    continue;
                }
                while self.pending.len() <= index {
                    self.pending.push(PendingToolCall::default());
                }
                let pending = &mut self.pending[index];
                if let Some(function) = &fragment.function {
                    if let Some(name) = &function.name {
                        pending.name.push_str(name);
                    }
                    if let Some(arguments) = &function.arguments {
                        pending.arguments.push_str(arguments);
                    }
                }
            }

            if let Some(reason) = &choice.finish_reason {
                self.finish_reason = Some(reason.clone());
            }
        }

        if text.is_empty() {
            None
        } else {
            Some(GenerateResponse::text_delta(text))
        }
    }

    /// Flush accumulated tool calls at end of stream
    ///
    /// Returns `None` when the stream carried no tool calls.
    pub fn finish(&mut self) -> Result<Option<GenerateResponse>, LlmError> {
        if self.pending.is_empty() {
            return Ok(None);
        }

        let calls = std::mem::take(&mut self.pending)
            .into_iter()
            .map(|pending| {
                let args = parse_arguments(&pending.arguments)?;
                Ok(FunctionCall {
                    name: pending.name,
                    args,
                })
            })
            .collect::<Result<Vec<_>, LlmError>>()?;

        Ok(Some(GenerateResponse::deferred_calls(
            calls,
            self.finish_reason.take(),
        )))
    }
}
