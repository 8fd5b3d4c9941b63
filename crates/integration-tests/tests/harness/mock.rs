//! Mock backend servers for integration tests
//!
//! Each mock speaks one backend's wire protocol and returns canned
//! responses. Streaming bodies are written in deliberately awkward byte
//! chunks so the decoding path sees the same fragmentation a real network
//! produces.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::extract::{Path, RawQuery, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use bytes::Bytes;
use futures_util::StreamExt;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

/// Canned non-streaming reply text
pub const CANNED_TEXT: &str = "Hello from mock";

/// Streamed text fragments; concatenation is the full reply
pub const TEXT_DELTAS: [&str; 3] = ["Hello", " world", "!"];

/// Canned embedding vector returned for every input
pub const CANNED_EMBEDDING: [f64; 3] = [0.1, 0.2, 0.3];

/// What a mock backend should do with generation requests
#[derive(Clone)]
enum Mode {
    /// Reply with canned text
    Text,
    /// Reply with a `get_weather` tool call (preceded by a text delta when streaming)
    ToolCall,
    /// Fail every request with this status and body
    Fail(u16, String),
}

struct Behavior {
    mode: Mode,
    /// Keep the connection open after the terminal signal
    hold_open: bool,
    /// Query string of the most recent request, for assertions on auth
    last_query: Mutex<Option<String>>,
}

async fn spawn(app: Router) -> anyhow::Result<(SocketAddr, CancellationToken)> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let shutdown = CancellationToken::new();
    let token = shutdown.clone();

    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                token.cancelled().await;
            })
            .await
            .ok();
    });

    Ok((addr, shutdown))
}

/// Build an SSE response body from pre-rendered event strings
fn sse_response(events: Vec<String>) -> Response {
    (
        [(header::CONTENT_TYPE, "text/event-stream")],
        events.concat(),
    )
        .into_response()
}

fn sse_data(value: &Value) -> String {
    format!("data: {value}\n\n")
}

/// SSE body whose connection never closes after the scripted events
fn sse_response_hold_open(events: Vec<String>) -> Response {
    let chunks = events
        .into_iter()
        .map(|e| Ok::<_, Infallible>(Bytes::from(e)));
    let body = Body::from_stream(
        futures_util::stream::iter(chunks).chain(futures_util::stream::pending()),
    );
    ([(header::CONTENT_TYPE, "text/event-stream")], body).into_response()
}

/// Split a payload into small chunks so lines cross read boundaries
fn fragmented_body(payload: String, chunk_size: usize, hold_open: bool) -> Response {
    let bytes = payload.into_bytes();
    let chunks: Vec<Result<Bytes, Infallible>> = bytes
        .chunks(chunk_size)
        .map(|c| Ok(Bytes::copy_from_slice(c)))
        .collect();
    let scripted = futures_util::stream::iter(chunks);
    if hold_open {
        Body::from_stream(scripted.chain(futures_util::stream::pending())).into_response()
    } else {
        Body::from_stream(scripted).into_response()
    }
}

fn fail_response(status: u16, body: &str) -> Response {
    let code = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (code, body.to_owned()).into_response()
}

// -- OpenAI-compatible mock --

/// Mock server speaking the chat-completions protocol
pub struct MockOpenAi {
    addr: SocketAddr,
    shutdown: CancellationToken,
}

impl MockOpenAi {
    pub async fn start() -> anyhow::Result<Self> {
        Self::start_with_mode(Mode::Text, false).await
    }

    /// Streamed replies carry a text delta followed by fragmented tool-call deltas
    pub async fn start_tool_calls() -> anyhow::Result<Self> {
        Self::start_with_mode(Mode::ToolCall, false).await
    }

    /// Keep the connection open after the terminal sentinel
    pub async fn start_hold_open() -> anyhow::Result<Self> {
        Self::start_with_mode(Mode::Text, true).await
    }

    pub async fn start_failing(status: u16, body: &str) -> anyhow::Result<Self> {
        Self::start_with_mode(Mode::Fail(status, body.to_owned()), false).await
    }

    async fn start_with_mode(mode: Mode, hold_open: bool) -> anyhow::Result<Self> {
        let behavior = Arc::new(Behavior {
            mode,
            hold_open,
            last_query: Mutex::new(None),
        });
        let app = Router::new()
            .route("/chat/completions", routing::post(openai_chat))
            .route("/embeddings", routing::post(openai_embeddings))
            .with_state(behavior);

        let (addr, shutdown) = spawn(app).await?;
        Ok(Self { addr, shutdown })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for MockOpenAi {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn openai_chat(State(behavior): State<Arc<Behavior>>, Json(body): Json<Value>) -> Response {
    if let Mode::Fail(status, message) = &behavior.mode {
        return fail_response(*status, message);
    }

    let streaming = body["stream"].as_bool().unwrap_or(false);
    let tool_call = matches!(behavior.mode, Mode::ToolCall);

    if !streaming {
        let message = if tool_call {
            json!({
                "role": "assistant",
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": {"name": "get_weather", "arguments": "{\"city\":\"Oslo\"}"}
                }]
            })
        } else {
            json!({"role": "assistant", "content": CANNED_TEXT})
        };
        let finish = if tool_call { "tool_calls" } else { "stop" };
        return Json(json!({
            "choices": [{"message": message, "finish_reason": finish}]
        }))
        .into_response();
    }

    let mut events = Vec::new();
    if tool_call {
        events.push(sse_data(&json!({
            "choices": [{"delta": {"content": "Checking"}, "finish_reason": null}]
        })));
        events.push(sse_data(&json!({
            "choices": [{"delta": {"tool_calls": [{
                "index": 0,
                "id": "call_1",
                "function": {"name": "get_weather", "arguments": ""}
            }]}, "finish_reason": null}]
        })));
        events.push(sse_data(&json!({
            "choices": [{"delta": {"tool_calls": [{
                "index": 0,
                "function": {"arguments": "{\"city\":"}
            }]}, "finish_reason": null}]
        })));
        events.push(sse_data(&json!({
            "choices": [{"delta": {"tool_calls": [{
                "index": 0,
                "function": {"arguments": "\"Oslo\"}"}
            }]}, "finish_reason": null}]
        })));
        events.push(sse_data(&json!({
            "choices": [{"delta": {}, "finish_reason": "tool_calls"}]
        })));
    } else {
        for delta in TEXT_DELTAS {
            events.push(sse_data(&json!({
                "choices": [{"delta": {"content": delta}, "finish_reason": null}]
            })));
        }
        events.push(sse_data(&json!({
            "choices": [{"delta": {}, "finish_reason": "stop"}]
        })));
    }
    events.push("data: [DONE]\n\n".to_owned());

    if behavior.hold_open {
        sse_response_hold_open(events)
    } else {
        sse_response(events)
    }
}

async fn openai_embeddings(
    State(behavior): State<Arc<Behavior>>,
    Json(body): Json<Value>,
) -> Response {
    if let Mode::Fail(status, message) = &behavior.mode {
        return fail_response(*status, message);
    }

    let count = body["input"].as_array().map_or(0, Vec::len);
    let data: Vec<Value> = (0..count)
        .map(|i| json!({"index": i, "embedding": CANNED_EMBEDDING}))
        .collect();
    Json(json!({"data": data})).into_response()
}

// -- Anthropic mock --

/// Mock server speaking the Messages API protocol
pub struct MockAnthropic {
    addr: SocketAddr,
    shutdown: CancellationToken,
}

impl MockAnthropic {
    pub async fn start() -> anyhow::Result<Self> {
        Self::start_with_mode(Mode::Text, false).await
    }

    pub async fn start_tool_calls() -> anyhow::Result<Self> {
        Self::start_with_mode(Mode::ToolCall, false).await
    }

    /// Keep the connection open after the terminal signal
    pub async fn start_hold_open() -> anyhow::Result<Self> {
        Self::start_with_mode(Mode::Text, true).await
    }

    pub async fn start_failing(status: u16, body: &str) -> anyhow::Result<Self> {
        Self::start_with_mode(Mode::Fail(status, body.to_owned()), false).await
    }

    async fn start_with_mode(mode: Mode, hold_open: bool) -> anyhow::Result<Self> {
        let behavior = Arc::new(Behavior {
            mode,
            hold_open,
            last_query: Mutex::new(None),
        });
        let app = Router::new()
            .route("/messages", routing::post(anthropic_messages))
            .with_state(behavior);

        let (addr, shutdown) = spawn(app).await?;
        Ok(Self { addr, shutdown })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for MockAnthropic {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

fn anthropic_event(name: &str, value: &Value) -> String {
    format!("event: {name}\ndata: {value}\n\n")
}

async fn anthropic_messages(
    State(behavior): State<Arc<Behavior>>,
    Json(body): Json<Value>,
) -> Response {
    if let Mode::Fail(status, message) = &behavior.mode {
        return fail_response(*status, message);
    }

    let streaming = body["stream"].as_bool().unwrap_or(false);
    let tool_call = matches!(behavior.mode, Mode::ToolCall);

    if !streaming {
        let content = if tool_call {
            json!([{
                "type": "tool_use",
                "id": "toolu_1",
                "name": "get_weather",
                "input": {"city": "Oslo"}
            }])
        } else {
            json!([{"type": "text", "text": CANNED_TEXT}])
        };
        let stop = if tool_call { "tool_use" } else { "end_turn" };
        return Json(json!({"content": content, "stop_reason": stop})).into_response();
    }

    let mut events = vec![anthropic_event("message_start", &json!({"type": "message_start"}))];
    if tool_call {
        events.push(anthropic_event(
            "content_block_start",
            &json!({
                "type": "content_block_start",
                "index": 0,
                "content_block": {"type": "text", "text": ""}
            }),
        ));
        events.push(anthropic_event(
            "content_block_delta",
            &json!({
                "type": "content_block_delta",
                "index": 0,
                "delta": {"type": "text_delta", "text": "Checking"}
            }),
        ));
        events.push(anthropic_event(
            "content_block_stop",
            &json!({"type": "content_block_stop", "index": 0}),
        ));
        events.push(anthropic_event(
            "content_block_start",
            &json!({
                "type": "content_block_start",
                "index": 1,
                "content_block": {"type": "tool_use", "id": "toolu_1", "name": "get_weather"}
            }),
        ));
        for fragment in ["{\"city\":", "\"Oslo\"}"] {
            events.push(anthropic_event(
                "content_block_delta",
                &json!({
                    "type": "content_block_delta",
                    "index": 1,
                    "delta": {"type": "input_json_delta", "partial_json": fragment}
                }),
            ));
        }
        events.push(anthropic_event(
            "content_block_stop",
            &json!({"type": "content_block_stop", "index": 1}),
        ));
        events.push(anthropic_event(
            "message_delta",
            &json!({"type": "message_delta", "delta": {"stop_reason": "tool_use"}}),
        ));
    } else {
        events.push(anthropic_event(
            "content_block_start",
            &json!({
                "type": "content_block_start",
                "index": 0,
                "content_block": {"type": "text", "text": ""}
            }),
        ));
        for delta in TEXT_DELTAS {
            events.push(anthropic_event(
                "content_block_delta",
                &json!({
                    "type": "content_block_delta",
                    "index": 0,
                    "delta": {"type": "text_delta", "text": delta}
                }),
            ));
        }
        events.push(anthropic_event(
            "content_block_stop",
            &json!({"type": "content_block_stop", "index": 0}),
        ));
        events.push(anthropic_event(
            "message_delta",
            &json!({"type": "message_delta", "delta": {"stop_reason": "end_turn"}}),
        ));
    }
    events.push(anthropic_event("message_stop", &json!({"type": "message_stop"})));

    if behavior.hold_open {
        sse_response_hold_open(events)
    } else {
        sse_response(events)
    }
}

// -- Ollama mock --

/// Mock server speaking the local daemon's NDJSON protocol
pub struct MockOllama {
    addr: SocketAddr,
    shutdown: CancellationToken,
}

impl MockOllama {
    pub async fn start() -> anyhow::Result<Self> {
        Self::start_with_mode(Mode::Text, false).await
    }

    pub async fn start_tool_calls() -> anyhow::Result<Self> {
        Self::start_with_mode(Mode::ToolCall, false).await
    }

    /// Keep the connection open after the terminal signal
    pub async fn start_hold_open() -> anyhow::Result<Self> {
        Self::start_with_mode(Mode::Text, true).await
    }

    pub async fn start_failing(status: u16, body: &str) -> anyhow::Result<Self> {
        Self::start_with_mode(Mode::Fail(status, body.to_owned()), false).await
    }

    async fn start_with_mode(mode: Mode, hold_open: bool) -> anyhow::Result<Self> {
        let behavior = Arc::new(Behavior {
            mode,
            hold_open,
            last_query: Mutex::new(None),
        });
        let app = Router::new()
            .route("/api/chat", routing::post(ollama_chat))
            .route("/api/embed", routing::post(ollama_embed))
            .with_state(behavior);

        let (addr, shutdown) = spawn(app).await?;
        Ok(Self { addr, shutdown })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for MockOllama {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn ollama_chat(State(behavior): State<Arc<Behavior>>, Json(body): Json<Value>) -> Response {
    if let Mode::Fail(status, message) = &behavior.mode {
        return fail_response(*status, message);
    }

    let streaming = body["stream"].as_bool().unwrap_or(false);
    let tool_call = matches!(behavior.mode, Mode::ToolCall);

    if !streaming {
        let message = if tool_call {
            json!({
                "role": "assistant",
                "content": "",
                "tool_calls": [{
                    "function": {"name": "get_weather", "arguments": {"city": "Oslo"}}
                }]
            })
        } else {
            json!({"role": "assistant", "content": CANNED_TEXT})
        };
        return Json(json!({"message": message, "done": true, "done_reason": "stop"}))
            .into_response();
    }

    let mut lines = Vec::new();
    if tool_call {
        lines.push(
            json!({
                "message": {"role": "assistant", "content": "Checking"},
                "done": false
            })
            .to_string(),
        );
        lines.push(
            json!({
                "message": {
                    "role": "assistant",
                    "content": "",
                    "tool_calls": [{
                        "function": {"name": "get_weather", "arguments": {"city": "Oslo"}}
                    }]
                },
                "done": false
            })
            .to_string(),
        );
    } else {
        for delta in TEXT_DELTAS {
            lines.push(
                json!({
                    "message": {"role": "assistant", "content": delta},
                    "done": false
                })
                .to_string(),
            );
        }
        // A garbage line the client is expected to skip
        lines.push("{this is not json".to_owned());
    }
    lines.push(
        json!({
            "message": {"role": "assistant", "content": ""},
            "done": true,
            "done_reason": "stop"
        })
        .to_string(),
    );

    let mut payload = lines.join("\n");
    payload.push('\n');
    // Small chunks force lines to straddle read boundaries
    fragmented_body(payload, 7, behavior.hold_open)
}

async fn ollama_embed(State(behavior): State<Arc<Behavior>>, Json(body): Json<Value>) -> Response {
    if let Mode::Fail(status, message) = &behavior.mode {
        return fail_response(*status, message);
    }

    let count = body["input"].as_array().map_or(0, Vec::len);
    let embeddings: Vec<Value> = (0..count).map(|_| json!(CANNED_EMBEDDING)).collect();
    Json(json!({"embeddings": embeddings})).into_response()
}

// -- Gemini mock --

/// Mock server speaking the Generative Language API protocol
pub struct MockGemini {
    addr: SocketAddr,
    shutdown: CancellationToken,
    behavior: Arc<Behavior>,
}

impl MockGemini {
    pub async fn start() -> anyhow::Result<Self> {
        Self::start_with_mode(Mode::Text, false).await
    }

    pub async fn start_failing(status: u16, body: &str) -> anyhow::Result<Self> {
        Self::start_with_mode(Mode::Fail(status, body.to_owned()), false).await
    }

    async fn start_with_mode(mode: Mode, hold_open: bool) -> anyhow::Result<Self> {
        let behavior = Arc::new(Behavior {
            mode,
            hold_open,
            last_query: Mutex::new(None),
        });
        let app = Router::new()
            .route("/models/{action}", routing::post(gemini_action))
            .with_state(Arc::clone(&behavior));

        let (addr, shutdown) = spawn(app).await?;
        Ok(Self {
            addr,
            shutdown,
            behavior,
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Query string of the most recent request
    pub fn last_query(&self) -> Option<String> {
        self.behavior.last_query.lock().unwrap().clone()
    }
}

impl Drop for MockGemini {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn gemini_action(
    State(behavior): State<Arc<Behavior>>,
    Path(action): Path<String>,
    RawQuery(query): RawQuery,
    Json(body): Json<Value>,
) -> Response {
    *behavior.last_query.lock().unwrap() = query;

    if let Mode::Fail(status, message) = &behavior.mode {
        return fail_response(*status, message);
    }

    // The path segment is "model:verb"
    let verb = action.rsplit(':').next().unwrap_or_default().to_owned();
    match verb.as_str() {
        "generateContent" => Json(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": CANNED_TEXT}]},
                "finishReason": "STOP"
            }]
        }))
        .into_response(),
        "streamGenerateContent" => {
            let mut events = Vec::new();
            for (i, delta) in TEXT_DELTAS.iter().enumerate() {
                let mut candidate = json!({
                    "content": {"role": "model", "parts": [{"text": delta}]}
                });
                if i == TEXT_DELTAS.len() - 1 {
                    candidate["finishReason"] = json!("STOP");
                }
                events.push(sse_data(&json!({"candidates": [candidate]})));
            }
            sse_response(events)
        }
        "countTokens" => Json(json!({"totalTokens": 42})).into_response(),
        "batchEmbedContents" => {
            let count = body["requests"].as_array().map_or(0, Vec::len);
            let embeddings: Vec<Value> =
                (0..count).map(|_| json!({"values": CANNED_EMBEDDING})).collect();
            Json(json!({"embeddings": embeddings})).into_response()
        }
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}
