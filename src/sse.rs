//! Server-Sent Events (SSE) decoding for streamed responses.
//!
//! SSE format:
//! ```text
//! data: {"type":"response.output_text.delta","delta":"Hel"}
//!
//! : keep-alive
//!
//! data: [DONE]
//! ```
//!
//! Events are newline-delimited and a transport chunk may end anywhere,
//! including inside a line or inside a multi-byte character. The decoder
//! keeps the unterminated tail as raw bytes and only decodes complete lines,
//! so the emitted deltas do not depend on how the body was chunked.

use futures::stream::{self, Stream, StreamExt};
use serde_json::Value;
use std::collections::VecDeque;
use tracing::warn;

use crate::client::CodexError;

const OUTPUT_TEXT_DELTA: &str = "response.output_text.delta";

/// A decoded stream event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A text delta. May be empty.
    Delta(String),
    /// The `[DONE]` sentinel. Nothing after it is processed.
    Done,
}

/// Incremental line decoder. Feed it chunks in arrival order.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    /// Leading bytes of `buffer` already known to hold no newline.
    scanned: usize,
    done: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the `[DONE]` sentinel has been seen.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Append a chunk and decode every line it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if self.done {
            return events;
        }

        self.buffer.extend_from_slice(chunk);

        let mut start = 0;
        let mut from = self.scanned;
        while let Some(offset) = self.buffer[from..].iter().position(|b| *b == b'\n') {
            let end = from + offset;
            let event = {
                let line = String::from_utf8_lossy(&self.buffer[start..end]);
                decode_line(line.strip_suffix('\r').unwrap_or(&line))
            };

            match event {
                Some(StreamEvent::Done) => {
                    self.done = true;
                    self.buffer.clear();
                    self.scanned = 0;
                    events.push(StreamEvent::Done);
                    return events;
                }
                Some(event) => events.push(event),
                None => {}
            }

            start = end + 1;
            from = start;
        }

        self.buffer.drain(..start);
        self.scanned = self.buffer.len();
        events
    }

    /// Signal end of input.
    ///
    /// An unterminated trailing fragment is discarded. Ending without the
    /// sentinel is a normal termination, so `Done` is always emitted once.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        if self.done {
            return Vec::new();
        }
        self.done = true;
        self.buffer.clear();
        self.scanned = 0;
        vec![StreamEvent::Done]
    }
}

/// Decode a single complete line.
fn decode_line(line: &str) -> Option<StreamEvent> {
    if line.trim().is_empty() || line.starts_with(':') {
        return None;
    }

    let data = parse_sse_line(line)?;
    if is_done_marker(data) {
        return Some(StreamEvent::Done);
    }

    let payload: Value = match serde_json::from_str(data) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Skipping malformed SSE payload: {}", e);
            return None;
        }
    };

    if payload.get("type").and_then(Value::as_str) != Some(OUTPUT_TEXT_DELTA) {
        return None;
    }

    let delta = payload
        .get("delta")
        .and_then(Value::as_str)
        .unwrap_or_default();
    Some(StreamEvent::Delta(delta.to_string()))
}

/// Parse an SSE line to extract the data portion.
///
/// # Example
/// ```
/// use codex_mcp::sse::parse_sse_line;
///
/// assert_eq!(parse_sse_line("data: {\"key\": \"value\"}"), Some("{\"key\": \"value\"}"));
/// assert_eq!(parse_sse_line("event: ping"), None);
/// ```
pub fn parse_sse_line(line: &str) -> Option<&str> {
    line.strip_prefix("data: ").map(|s| s.trim())
}

/// Check if an SSE data payload is the end-of-stream sentinel.
pub fn is_done_marker(data: &str) -> bool {
    data == "[DONE]"
}

struct DecodeState<S> {
    chunks: std::pin::Pin<Box<S>>,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    finished: bool,
}

impl<S> DecodeState<S> {
    fn enqueue(&mut self, events: Vec<StreamEvent>) {
        for event in events {
            match event {
                StreamEvent::Delta(delta) => self.pending.push_back(delta),
                StreamEvent::Done => self.finished = true,
            }
        }
    }
}

/// Turn a stream of byte chunks into a lazy, single-pass stream of text deltas.
///
/// The stream ends after `[DONE]` or at end of input. A read error is
/// yielded once and then the stream ends; deltas decoded before it are
/// delivered first.
pub fn output_text_deltas<S, B, E>(chunks: S) -> impl Stream<Item = Result<String, E>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
{
    let state = DecodeState {
        chunks: Box::pin(chunks),
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(delta) = state.pending.pop_front() {
                return Some((Ok(delta), state));
            }
            if state.finished {
                return None;
            }

            match state.chunks.next().await {
                Some(Ok(chunk)) => {
                    let events = state.decoder.push(chunk.as_ref());
                    state.enqueue(events);
                }
                Some(Err(e)) => {
                    state.finished = true;
                    return Some((Err(e), state));
                }
                None => {
                    let events = state.decoder.finish();
                    state.enqueue(events);
                }
            }
        }
    })
}

/// Extension trait for `reqwest::Response` to decode a streamed response body.
pub trait SSEResponseExt {
    fn output_text_deltas(self) -> impl Stream<Item = Result<String, CodexError>> + Send;
}

impl SSEResponseExt for reqwest::Response {
    fn output_text_deltas(self) -> impl Stream<Item = Result<String, CodexError>> + Send {
        output_text_deltas(self.bytes_stream()).map(|item| item.map_err(CodexError::from))
    }
}
