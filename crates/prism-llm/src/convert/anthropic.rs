//! Conversion between canonical types and the Anthropic wire format

use crate::error::LlmError;
use crate::protocol::anthropic::{
    AnthropicContentBlock, AnthropicMessage, AnthropicRequest, AnthropicResponse,
    AnthropicResponseBlock, AnthropicStreamContentBlock, AnthropicStreamDelta,
    AnthropicStreamEvent, AnthropicTool,
};
use crate::types::response::DEFAULT_FINISH_REASON;
use crate::types::{Content, FunctionCall, GenerateRequest, GenerateResponse, Part, Role};

/// Default max tokens when not specified (Anthropic requires this field)
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

// -- Outbound: canonical request -> Anthropic wire request --

impl From<&GenerateRequest> for AnthropicRequest {
    fn from(req: &GenerateRequest) -> Self {
        let messages = req
            .contents
            .iter()
            .flat_map(internal_content_to_anthropic)
            .collect();

        let tools = req.tools.as_ref().map(|tools| {
            tools
                .iter()
                .map(|t| AnthropicTool {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    input_schema: t
                        .parameters
                        .clone()
                        .unwrap_or_else(|| serde_json::json!({"type": "object"})),
                })
                .collect()
        });

        Self {
            model: String::new(),
            max_tokens: req
                .generation_config
                .max_output_tokens
                .unwrap_or(DEFAULT_MAX_TOKENS),
            system: req.system_instruction.clone(),
            messages,
            temperature: req.generation_config.temperature,
            top_p: req.generation_config.top_p,
            stream: None,
            tools,
        }
    }
}

/// Convert one canonical content entry into zero or more Anthropic messages
///
/// Function-response parts each become their own user message holding a
/// single `tool_result` block; the function name doubles as the tool-use id.
fn internal_content_to_anthropic(content: &Content) -> Vec<AnthropicMessage> {
    let responses: Vec<&crate::types::FunctionResponse> = content.function_responses().collect();
    if !responses.is_empty() {
        return responses
            .into_iter()
            .map(|resp| AnthropicMessage {
                role: "user".to_owned(),
                content: vec![AnthropicContentBlock::ToolResult {
                    tool_use_id: resp.name.clone(),
                    content: Some(resp.response.to_string()),
                }],
            })
            .collect();
    }

    let role = match content.role {
        Role::Model => "assistant",
        Role::User => "user",
    };

    let mut blocks = Vec::new();
    let text = content.text();
    if !text.trim().is_empty() {
        blocks.push(AnthropicContentBlock::Text { text });
    }

    for call in content.function_calls() {
        blocks.push(AnthropicContentBlock::ToolUse {
            id: call.name.clone(),
            name: call.name.clone(),
            input: call.args.clone(),
        });
    }

    if blocks.is_empty() {
        return Vec::new();
    }

    vec![AnthropicMessage {
        role: role.to_owned(),
        content: blocks,
    }]
}

// -- Inbound: Anthropic wire response -> canonical --

impl From<AnthropicResponse> for GenerateResponse {
    fn from(resp: AnthropicResponse) -> Self {
        let parts = resp
            .content
            .into_iter()
            .map(|block| match block {
                AnthropicResponseBlock::Text { text } => Part::Text(text),
                AnthropicResponseBlock::ToolUse { name, input, .. } => {
                    Part::FunctionCall(FunctionCall { name, args: input })
                }
            })
            .collect();

        Self::from_parts(parts, resp.stop_reason)
    }
}

// -- Stream conversion --

/// What one decoded Anthropic stream event produced
#[derive(Debug)]
pub enum AnthropicStep {
    /// Nothing to emit
    None,
    /// An immediate text delta
    Emit(GenerateResponse),
    /// Stream finished; the payload is the deferred tool-call element
    Finished(Option<GenerateResponse>),
}

/// Accumulator for a streamed Anthropic message
///
/// Text deltas pass through immediately; tool-use blocks accumulate their
/// input JSON fragments and flush as canonical function calls when the
/// `message_stop` event arrives.
#[derive(Debug, Default)]
pub struct AnthropicStreamState {
    current_tool: Option<PendingTool>,
    pending: Vec<FunctionCall>,
    finish_reason: Option<String>,
}

#[derive(Debug)]
struct PendingTool {
    name: String,
    input_json: String,
}

impl AnthropicStreamState {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the state machine with one decoded SSE event
    pub fn convert_event(&mut self, event: AnthropicStreamEvent) -> Result<AnthropicStep, LlmError> {
        match event {
            AnthropicStreamEvent::MessageStart
            | AnthropicStreamEvent::Ping
            | AnthropicStreamEvent::ContentBlockStart {
                content_block: AnthropicStreamContentBlock::Text { .. },
                ..
            } => Ok(AnthropicStep::None),

            AnthropicStreamEvent::ContentBlockStart {
                content_block: AnthropicStreamContentBlock::ToolUse { name, .. },
                ..
            } => {
                self.current_tool = Some(PendingTool {
                    name,
                    input_json: String::new(),
                });
                Ok(AnthropicStep::None)
            }

            AnthropicStreamEvent::ContentBlockDelta { delta, .. } => match delta {
                AnthropicStreamDelta::TextDelta { text } => {
                    Ok(AnthropicStep::Emit(GenerateResponse::text_delta(text)))
                }
                AnthropicStreamDelta::InputJsonDelta { partial_json } => {
                    if let Some(tool) = &mut self.current_tool {
                        tool.input_json.push_str(&partial_json);
                    }
                    Ok(AnthropicStep::None)
                }
            },

            AnthropicStreamEvent::ContentBlockStop { .. } => {
                if let Some(tool) = self.current_tool.take() {
                    let trimmed = tool.input_json.trim();
                    let args = if trimmed.is_empty() {
                        serde_json::json!({})
                    } else {
                        serde_json::from_str(trimmed).map_err(|e| {
                            LlmError::ToolArguments(format!("{e} in {trimmed:?}"))
                        })?
                    };
                    self.pending.push(FunctionCall {
                        name: tool.name,
                        args,
                    });
                }
                Ok(AnthropicStep::None)
            }

            AnthropicStreamEvent::MessageDelta { delta } => {
                if delta.stop_reason.is_some() {
                    self.finish_reason = delta.stop_reason;
                }
                Ok(AnthropicStep::None)
            }

            AnthropicStreamEvent::MessageStop => {
                let finish_reason = self.finish_reason.take();
                if self.pending.is_empty() {
                    Ok(AnthropicStep::Finished(None))
                } else {
                    let calls = std::mem::take(&mut self.pending);
                    Ok(AnthropicStep::Finished(Some(
                        GenerateResponse::deferred_calls(calls, finish_reason),
                    )))
                }
            }
        }
    }
}
