//! Gemini SSE stream -> Chat Completions chunk stream.
//!
//! [`transform_event`] is the per-event state machine. [`StreamTranscoder`] and
//! [`transcode_stream`] wrap it for callers holding raw upstream bytes: they buffer
//! incomplete frames across reads and append the `[DONE]` terminator.

use bytes::Bytes;
use futures_util::{stream, Stream, StreamExt};
use serde_json::Value;

use crate::error::BridgeError;
use crate::ids::{tool_call_id, IdSource};
use crate::models::chat::{
    ChatCompletionChunk, ChatDelta, ChatStreamChoice, FunctionCallDelta, ToolCallDelta,
};
use crate::models::gemini::{GenerateContentResponse, PartKind};
use crate::response::map_finish_reason;
use crate::sse::{last_frame_boundary, parse_sse, SseEvent};

/// Payload Gemini-compatible upstreams may send to mark the end of a stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Upper bound on bytes held while waiting for a frame terminator.
pub const MAX_PENDING_FRAME_BYTES: usize = 8 * 1024 * 1024;

/// Per-stream translation state. One instance per response stream, never shared.
#[derive(Debug, Clone)]
pub struct StreamState {
    id: String,
    created: u64,
    created_millis: u64,
    model: String,
    preamble_sent: bool,
    next_tool_index: u32,
    last_thought_signature: Option<String>,
}

impl StreamState {
    pub fn new(model: impl Into<String>, ids: &dyn IdSource) -> Self {
        let millis = ids.now_millis();
        Self {
            id: ids.completion_id(),
            created: millis / 1000,
            created_millis: millis,
            model: model.into(),
            preamble_sent: false,
            next_tool_index: 0,
            last_thought_signature: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created(&self) -> u64 {
        self.created
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn preamble_sent(&self) -> bool {
        self.preamble_sent
    }

    /// Most recent `thoughtSignature` seen on the stream. Kept for cache resumption,
    /// never forwarded to the client.
    pub fn last_thought_signature(&self) -> Option<&str> {
        self.last_thought_signature.as_deref()
    }

    fn chunk(&self, delta: ChatDelta, finish_reason: Option<&str>) -> ChatCompletionChunk {
        ChatCompletionChunk {
            id: self.id.clone(),
            object: "chat.completion.chunk".to_string(),
            created: self.created,
            model: self.model.clone(),
            choices: vec![ChatStreamChoice {
                index: 0,
                delta,
                finish_reason: finish_reason.map(str::to_string),
            }],
        }
    }
}

/// Translate one upstream SSE event into zero or more Chat Completions chunks.
///
/// - `[DONE]`, empty and unparseable payloads produce nothing.
/// - The first event with a candidate is preceded by a role-only chunk.
/// - Text parts (thoughts included) become content deltas, function calls become
///   tool-call deltas with increasing indexes, signatures only update `state`.
/// - A finish reason yields a final empty delta; unmapped reasons map to `null`.
///
/// The caller terminates the client stream; this function never does.
pub fn transform_event(event: &SseEvent, state: &mut StreamState) -> Vec<ChatCompletionChunk> {
    let payload = event.data.trim();
    if payload.is_empty() || payload == DONE_SENTINEL {
        return Vec::new();
    }
    let value: Value = match serde_json::from_str(payload) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, len = payload.len(), "skipping unparseable stream event");
            return Vec::new();
        }
    };
    let Some(response) = GenerateContentResponse::from_value(&value) else {
        return Vec::new();
    };
    let Some(candidate) = response.first_candidate() else {
        return Vec::new();
    };

    let mut chunks = Vec::new();
    if !state.preamble_sent {
        state.preamble_sent = true;
        chunks.push(state.chunk(
            ChatDelta {
                role: Some("assistant".to_string()),
                content: Some(String::new()),
                tool_calls: None,
            },
            None,
        ));
    }

    let parts = candidate
        .content
        .as_ref()
        .map(|c| c.parts.as_slice())
        .unwrap_or_default();
    for part in parts {
        if let Some(signature) = part.thought_signature.as_deref() {
            state.last_thought_signature = Some(signature.to_string());
        }
        match part.kind() {
            PartKind::Text { text, .. } if !text.is_empty() => {
                chunks.push(state.chunk(
                    ChatDelta {
                        content: Some(text.to_string()),
                        ..Default::default()
                    },
                    None,
                ));
            }
            PartKind::FunctionCall(call) => {
                let index = state.next_tool_index;
                state.next_tool_index += 1;
                chunks.push(state.chunk(
                    ChatDelta {
                        tool_calls: Some(vec![ToolCallDelta {
                            index,
                            id: Some(tool_call_id(state.created_millis, index as usize)),
                            call_type: Some("function".to_string()),
                            function: Some(FunctionCallDelta {
                                name: Some(call.name.clone()),
                                arguments: Some(call.args.to_string()),
                            }),
                        }]),
                        ..Default::default()
                    },
                    None,
                ));
            }
            _ => {}
        }
    }

    if let Some(reason) = candidate.finish_reason.as_deref() {
        chunks.push(state.chunk(ChatDelta::default(), map_finish_reason(reason)));
    }
    chunks
}

/// Encode a chunk as one `data: <json>\n\n` SSE frame.
pub fn encode_chunk(chunk: &ChatCompletionChunk) -> Result<Bytes, BridgeError> {
    let json = serde_json::to_string(chunk).map_err(|source| BridgeError::Serialize {
        what: "stream chunk",
        source,
    })?;
    Ok(Bytes::from(format!("data: {json}\n\n")))
}

/// The frame that closes a Chat Completions stream.
pub fn done_frame() -> Bytes {
    Bytes::from(format!("data: {DONE_SENTINEL}\n\n"))
}

/// Incremental transcoder from raw upstream bytes to encoded Chat Completions frames.
///
/// A partial frame that grows past the pending limit is discarded with a warning.
#[derive(Debug)]
pub struct StreamTranscoder {
    state: StreamState,
    buffer: Vec<u8>,
    max_pending: usize,
    finished: bool,
}

impl StreamTranscoder {
    pub fn new(state: StreamState) -> Self {
        Self::with_max_pending(state, MAX_PENDING_FRAME_BYTES)
    }

    pub fn with_max_pending(state: StreamState, max_pending: usize) -> Self {
        Self {
            state,
            buffer: Vec::new(),
            max_pending,
            finished: false,
        }
    }

    pub fn state(&self) -> &StreamState {
        &self.state
    }

    /// Bytes currently held back as an incomplete frame.
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    /// Feed upstream bytes; returns the frames for every complete upstream event.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Bytes> {
        // the held-back prefix was already scanned and holds no terminator
        let scanned = self.buffer.len();
        self.buffer.extend_from_slice(bytes);
        let Some(end) = last_frame_boundary(&self.buffer, scanned) else {
            self.enforce_pending_limit();
            return Vec::new();
        };
        let complete: Vec<u8> = self.buffer.drain(..end).collect();
        let frames = self.translate(&complete);
        self.enforce_pending_limit();
        frames
    }

    fn enforce_pending_limit(&mut self) {
        if self.buffer.len() > self.max_pending {
            tracing::warn!(
                pending = self.buffer.len(),
                limit = self.max_pending,
                "discarding oversized partial stream frame"
            );
            self.buffer.clear();
        }
    }

    /// Flush any buffered partial frame and emit the `[DONE]` terminator.
    ///
    /// Subsequent calls return nothing.
    pub fn finish(&mut self) -> Vec<Bytes> {
        if self.finished {
            return Vec::new();
        }
        self.finished = true;
        let rest = std::mem::take(&mut self.buffer);
        let mut frames = self.translate(&rest);
        frames.push(done_frame());
        frames
    }

    fn translate(&mut self, raw: &[u8]) -> Vec<Bytes> {
        if raw.is_empty() {
            return Vec::new();
        }
        let text = String::from_utf8_lossy(raw);
        let mut frames = Vec::new();
        for event in parse_sse(&text) {
            for chunk in transform_event(&event, &mut self.state) {
                match encode_chunk(&chunk) {
                    Ok(frame) => frames.push(frame),
                    Err(e) => tracing::warn!(error = %e, "dropping unencodable chunk"),
                }
            }
        }
        frames
    }
}

/// Adapt an upstream byte stream into an encoded Chat Completions SSE stream.
///
/// Upstream errors are forwarded unchanged; the `[DONE]` frame follows the last
/// upstream item.
pub fn transcode_stream<S, E>(upstream: S, state: StreamState) -> impl Stream<Item = Result<Bytes, E>>
where
    S: Stream<Item = Result<Bytes, E>>,
{
    let mut transcoder = StreamTranscoder::new(state);
    upstream
        .map(Some)
        .chain(stream::once(async { None }))
        .flat_map(move |item| {
            let out: Vec<Result<Bytes, E>> = match item {
                Some(Ok(bytes)) => transcoder.push(&bytes).into_iter().map(Ok).collect(),
                Some(Err(e)) => vec![Err(e)],
                None => transcoder.finish().into_iter().map(Ok).collect(),
            };
            stream::iter(out)
        })
}
