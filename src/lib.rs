#![forbid(unsafe_code)]
#![doc = r#"
Chat2Gemini

Translate OpenAI Chat Completions requests into Gemini `generateContent` payloads, and Gemini
responses (single-shot or streamed over SSE) back into Chat Completions shapes.

Crate highlights
- Requests: `to_gemini_request(&ChatCompletionRequest)` plus `to_gemini_body(&[u8])` for raw bodies.
- Tool schemas: `schema::rewrite` lowers arbitrary JSON Schema to the subset Gemini accepts.
- Responses: `to_chat_response(&Value, model)` for `generateContent` results.
- Streaming: `transform_event` per SSE event, or `StreamTranscoder` / `transcode_stream` over raw bytes.

Modules
- `models`: Data structures for Chat Completions and Gemini.
- `schema`: Tool parameter schema rewriting.
- `conversion`: Mapping logic from Chat -> Gemini.
- `response`: Mapping logic from Gemini -> Chat (single-shot).
- `sse` / `streaming`: SSE framing and the streaming state machine.
- `config`: Translation tunables (file or environment).
- `util`: Shared helpers (tracing, env).

Transport, authentication and model routing are left to the caller.
"#]

pub mod config;
pub mod conversion;
pub mod error;
pub mod ids;
pub mod models;
pub mod response;
pub mod schema;
pub mod sse;
pub mod streaming;
pub mod util;

// Re-export the primary entry points for ergonomic library use.
pub use crate::config::TranslationConfig;
pub use crate::conversion::{
    parse_chat_request, to_gemini_body, to_gemini_request, to_gemini_request_with_config,
};
pub use crate::error::BridgeError;
pub use crate::ids::{FixedIds, IdSource, SystemIds};
pub use crate::response::{to_chat_response, to_chat_response_with_ids};
pub use crate::schema::rewrite as rewrite_schema;
pub use crate::sse::{parse_sse, SseEvent};
pub use crate::streaming::{
    encode_chunk, transcode_stream, transform_event, StreamState, StreamTranscoder,
};

// Re-export model namespaces for convenience (downstream users can do `use chat2gemini::chat`).
pub use crate::models::{chat, gemini};
