//! Conversion between canonical types and the Gemini wire format
//!
//! The canonical vocabulary shares the Gemini contents/parts shape, so this
//! translator is the closest to an identity mapping of the four. It still
//! goes through explicit wire structs so the serialized request matches the
//! Generative Language API byte-for-byte.

use crate::protocol::gemini::{
    GeminiCandidate, GeminiContent, GeminiFunctionCall, GeminiFunctionDeclaration,
    GeminiFunctionResponse, GeminiGenerationConfig, GeminiPart, GeminiRequest, GeminiResponse,
    GeminiTool,
};
use crate::types::{
    Candidate, Content, FunctionCall, GenerateRequest, GenerateResponse, Part, Role,
};
use crate::types::response::DEFAULT_FINISH_REASON;

// -- Outbound: canonical request -> Gemini wire request --

impl From<&GenerateRequest> for GeminiRequest {
    fn from(req: &GenerateRequest) -> Self {
        let contents = req
            .contents
            .iter()
            .filter_map(internal_content_to_gemini)
            .collect();

        let system_instruction = req.system_instruction.as_ref().map(|text| GeminiContent {
            role: None,
            parts: vec![GeminiPart::Text(text.clone())],
        });

        let generation_config = Some(GeminiGenerationConfig {
            temperature: req.generation_config.temperature,
            top_p: req.generation_config.top_p,
            max_output_tokens: req.generation_config.max_output_tokens,
        });

        let tools = req.tools.as_ref().map(|tools| {
            vec![GeminiTool {
                function_declarations: tools
                    .iter()
                    .map(|t| GeminiFunctionDeclaration {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        parameters: t.parameters.clone(),
                    })
                    .collect(),
            }]
        });

        Self {
            contents,
            system_instruction,
            generation_config,
            tools,
        }
    }
}

/// Convert one canonical content entry, dropping entries that end up empty
fn internal_content_to_gemini(content: &Content) -> Option<GeminiContent> {
    let role = match content.role {
        Role::User => "user",
        Role::Model => "model",
    };

    let parts: Vec<GeminiPart> = content
        .parts
        .iter()
        .filter_map(|part| match part {
            Part::Text(text) => {
                if text.trim().is_empty() {
                    None
                } else {
                    Some(GeminiPart::Text(text.clone()))
                }
            }
            Part::FunctionCall(call) => Some(GeminiPart::FunctionCall(GeminiFunctionCall {
                name: call.name.clone(),
                args: call.args.clone(),
            })),
            Part::FunctionResponse(resp) => {
                Some(GeminiPart::FunctionResponse(GeminiFunctionResponse {
                    name: resp.name.clone(),
                    response: resp.response.clone(),
                }))
            }
        })
        .collect();

    if parts.is_empty() {
        return None;
    }

    Some(GeminiContent {
        role: Some(role.to_owned()),
        parts,
    })
}

// -- Inbound: Gemini wire response -> canonical --

impl From<GeminiResponse> for GenerateResponse {
    fn from(resp: GeminiResponse) -> Self {
        let candidates: Vec<Candidate> = resp
            .candidates
            .into_iter()
            .map(gemini_candidate_to_internal)
            .collect();

        let (text, function_calls) = candidates.first().map_or_else(
            || (String::new(), Vec::new()),
            |c| (c.content.text(), c.content.function_calls().cloned().collect()),
        );

        Self {
            candidates,
            text,
            function_calls,
        }
    }
}

fn gemini_candidate_to_internal(candidate: GeminiCandidate) -> Candidate {
    let parts = candidate
        .content
        .parts
        .into_iter()
        .map(|part| match part {
            GeminiPart::Text(text) => Part::Text(text),
            GeminiPart::FunctionCall(call) => Part::FunctionCall(FunctionCall {
                name: call.name,
                args: call.args,
            }),
            GeminiPart::FunctionResponse(resp) => {
                Part::FunctionResponse(crate::types::FunctionResponse {
                    name: resp.name,
                    response: resp.response,
                })
            }
        })
        .collect();

    Candidate {
        content: Content {
            role: Role::from_str_lossy(candidate.content.role.as_deref()),
            parts,
        },
        finish_reason: candidate
            .finish_reason
            .unwrap_or_else(|| DEFAULT_FINISH_REASON.to_owned()),
    }
}

// -- Stream conversion --

/// Convert one streamed Gemini chunk into a canonical partial response
///
/// Gemini streams full response objects: text parts are incremental deltas
/// and functionCall parts arrive complete, so no accumulator is needed.
pub fn gemini_chunk_to_response(chunk: GeminiResponse) -> Option<GenerateResponse> {
    if chunk.candidates.is_empty() {
        return None;
    }
    Some(chunk.into())
}
