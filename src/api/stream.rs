//! Incremental decoder for the reply stream.
//!
//! Replies arrive as server-sent events, one `data:{json}` line per event.
//! Each event may carry a `delta` string; the reply is their concatenation.
//! Network chunks do not respect line boundaries, so bytes are buffered until
//! a full line is available.

use serde::Deserialize;
use tracing::warn;

use crate::constants::{SSE_DATA_PREFIX, SSE_DONE_MARKER};

/// Something that happened on the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A piece of reply text.
    Delta(String),
    /// The service reported a failure mid-stream.
    Error(String),
    /// Explicit end-of-stream marker.
    Done,
}

#[derive(Debug, Deserialize)]
struct EventPayload {
    #[serde(default)]
    delta: Option<String>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

/// Line-buffering SSE decoder.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes; returns every event completed by them.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<StreamEvent> {
        self.buffer.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            // Decode per line so multi-byte characters split across chunks survive
            let line = String::from_utf8_lossy(&line);
            if let Some(event) = parse_line(line.trim_end_matches(['\r', '\n'])) {
                events.push(event);
            }
        }
        events
    }

    /// Flush a trailing line that was not newline-terminated.
    pub fn finish(&mut self) -> Option<StreamEvent> {
        if self.buffer.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.buffer);
        let line = String::from_utf8_lossy(&rest);
        parse_line(line.trim_end_matches('\r'))
    }
}

fn parse_line(line: &str) -> Option<StreamEvent> {
    let data = line.strip_prefix(SSE_DATA_PREFIX)?.trim();
    if data.is_empty() {
        return None;
    }
    if data == SSE_DONE_MARKER {
        return Some(StreamEvent::Done);
    }

    let payload: EventPayload = match serde_json::from_str(data) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "skipping malformed stream line");
            return None;
        }
    };

    if let Some(err) = payload.error {
        let message = match &err {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Object(obj) => obj
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| err.to_string()),
            other => other.to_string(),
        };
        return Some(StreamEvent::Error(message));
    }

    payload
        .delta
        .filter(|d| !d.is_empty())
        .map(StreamEvent::Delta)
}
