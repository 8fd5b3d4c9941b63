//! Shared framed-stream decoding for streaming backends
//!
//! Backends frame their streaming responses one of two ways: Server-Sent
//! Events (data-prefixed lines, blank-line separators, a `[DONE]` terminal
//! sentinel) or newline-delimited JSON (each complete line is one chunk
//! object). This module turns a raw byte stream into discrete JSON record
//! payloads under either convention; each provider's chunk handler then
//! interprets one record at a time.

use std::fmt::Display;
use std::pin::Pin;

use bytes::Bytes;
use eventsource_stream::Eventsource;
use futures_util::{Stream, StreamExt};

use crate::error::LlmError;

/// Terminal sentinel used by event-stream backends
pub const DONE_SENTINEL: &str = "[DONE]";

/// Framing convention of a streaming response body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// Server-Sent Events with data-prefixed lines
    EventStream,
    /// One complete JSON object per line
    NdJson,
}

/// One decoded frame from a streaming response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFrame {
    /// A complete record payload, expected to be a JSON object
    Record(String),
    /// The terminal sentinel was seen
    Done,
}

/// Boxed stream of decoded frames
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<StreamFrame, LlmError>> + Send>>;

/// Decode a byte stream into discrete JSON record payloads
///
/// Event-stream framing ignores comment and keep-alive lines and maps the
/// `[DONE]` sentinel to [`StreamFrame::Done`]. NDJSON framing reassembles
/// partial lines across read boundaries and emits every complete non-empty
/// line; end-of-stream detection is left to the caller (the done flag lives
/// inside the record).
pub fn json_records<S, E>(bytes: S, framing: Framing) -> FrameStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    match framing {
        Framing::EventStream => Box::pin(bytes.eventsource().filter_map(|result| async move {
            match result {
                Ok(event) => {
                    let data = event.data.trim();
                    if data.is_empty() {
                        None
                    } else if data == DONE_SENTINEL {
                        Some(Ok(StreamFrame::Done))
                    } else {
                        Some(Ok(StreamFrame::Record(data.to_owned())))
                    }
                }
                Err(e) => Some(Err(LlmError::Streaming(e.to_string()))),
            }
        })),
        Framing::NdJson => Box::pin(ndjson_frames(bytes)),
    }
}

/// Reassemble an NDJSON byte stream into complete lines
///
/// Holds the trailing partial line between reads; the held tail is never a
/// data-bearing record because both NDJSON backends terminate with an
/// in-band done record before closing the connection.
fn ndjson_frames<S, E>(bytes: S) -> impl Stream<Item = Result<StreamFrame, LlmError>> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let mut carry: Vec<u8> = Vec::new();

    bytes
        .map(move |chunk| match chunk {
            Ok(bytes) => {
                carry.extend_from_slice(&bytes);

                let mut frames = Vec::new();
                while let Some(pos) = carry.iter().position(|&b| b == b'\n') {
                    let line: Vec<u8> = carry.drain(..=pos).collect();
                    let line = String::from_utf8_lossy(&line);
                    let line = line.trim();
                    if !line.is_empty() {
                        frames.push(Ok(StreamFrame::Record(line.to_owned())));
                    }
                }
                frames
            }
            Err(e) => vec![Err(LlmError::Streaming(e.to_string()))],
        })
        .flat_map(futures_util::stream::iter)
}
