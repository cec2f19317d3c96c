#![allow(clippy::unwrap_used)]
//! Data models for the Chat Completions and Gemini APIs.
//!
//! This module groups two submodules:
//! - `chat`: Types representing a commonly used subset of the OpenAI Chat Completions models
//!   (request, response, streaming chunk).
//! - `gemini`: Types representing the Gemini `generateContent` request and response bodies.
//!
//! The mapping logic lives in `crate::conversion` (requests), `crate::response` and
//! `crate::streaming` (responses).

pub mod chat;
pub mod gemini;

// Optional convenience re-exports for downstream users.
// These allow importing commonly-used types directly from `chat2gemini::models::*`.
pub use chat::{
    ChatCompletionChunk, ChatCompletionRequest, ChatCompletionResponse, ChatMessage, FunctionDef,
    Role, ToolCall, ToolDefinition,
};
pub use gemini::{
    Content, ContentRole, FunctionCallingMode, GenerateContentRequest, GenerateContentResponse,
    Part, PartKind,
};
