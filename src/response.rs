//! Gemini response -> Chat Completions response.

use serde_json::Value;

use crate::ids::{tool_call_id, IdSource, SystemIds};
use crate::models::chat::{
    ChatChoice, ChatCompletionResponse, ChatResponseMessage, ChatUsage, FunctionCall, ToolCall,
};
use crate::models::gemini::{GenerateContentResponse, PartKind};

/// Gemini finish reasons with a Chat Completions equivalent.
const FINISH_REASONS: &[(&str, &str)] = &[
    ("STOP", "stop"),
    ("MAX_TOKENS", "length"),
    ("SAFETY", "content_filter"),
    ("RECITATION", "content_filter"),
    ("OTHER", "stop"),
];

/// Look up the Chat Completions finish reason for a Gemini one.
///
/// Callers choose the default for unmapped reasons: the single-shot path reports
/// `"stop"`, the streaming path reports none.
pub fn map_finish_reason(reason: &str) -> Option<&'static str> {
    FINISH_REASONS
        .iter()
        .find(|(gemini, _)| *gemini == reason)
        .map(|(_, chat)| *chat)
}

/// Convert a Gemini `generateContent` response document into a Chat Completions response.
pub fn to_chat_response(response: &Value, model: &str) -> ChatCompletionResponse {
    to_chat_response_with_ids(response, model, &SystemIds)
}

/// [`to_chat_response`] with an explicit id/clock source.
///
/// Only the first candidate is used. Text parts are concatenated in order, function
/// calls become tool calls with ids derived from the timestamp and their position.
/// Gemini does not report usage in a form we forward, so usage is zero.
pub fn to_chat_response_with_ids(
    response: &Value,
    model: &str,
    ids: &dyn IdSource,
) -> ChatCompletionResponse {
    let millis = ids.now_millis();
    let decoded = GenerateContentResponse::from_value(response).unwrap_or_else(|| {
        tracing::warn!("gemini response has no recognizable shape");
        GenerateContentResponse::default()
    });
    let candidate = decoded.first_candidate();

    let mut text = String::new();
    let mut tool_calls: Vec<ToolCall> = Vec::new();
    let parts = candidate
        .and_then(|c| c.content.as_ref())
        .map(|c| c.parts.as_slice())
        .unwrap_or_default();
    for part in parts {
        match part.kind() {
            PartKind::Text { text: t, .. } if !t.is_empty() => text.push_str(t),
            PartKind::FunctionCall(call) => tool_calls.push(ToolCall {
                id: tool_call_id(millis, tool_calls.len()),
                call_type: "function".to_string(),
                function: FunctionCall {
                    name: call.name.clone(),
                    arguments: call.args.to_string(),
                },
            }),
            _ => {}
        }
    }

    let finish_reason = candidate
        .and_then(|c| c.finish_reason.as_deref())
        .and_then(map_finish_reason)
        .unwrap_or("stop");

    ChatCompletionResponse {
        id: ids.completion_id(),
        object: "chat.completion".to_string(),
        created: millis / 1000,
        model: model.to_string(),
        choices: vec![ChatChoice {
            index: 0,
            message: ChatResponseMessage {
                role: "assistant".to_string(),
                content: if text.is_empty() && !tool_calls.is_empty() {
                    None
                } else {
                    Some(text)
                },
                tool_calls: if tool_calls.is_empty() {
                    None
                } else {
                    Some(tool_calls)
                },
            },
            finish_reason: Some(finish_reason.to_string()),
        }],
        usage: Some(ChatUsage::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::FixedIds;
    use serde_json::json;

    #[test]
    fn finish_reason_table() {
        assert_eq!(map_finish_reason("STOP"), Some("stop"));
        assert_eq!(map_finish_reason("MAX_TOKENS"), Some("length"));
        assert_eq!(map_finish_reason("SAFETY"), Some("content_filter"));
        assert_eq!(map_finish_reason("RECITATION"), Some("content_filter"));
        assert_eq!(map_finish_reason("OTHER"), Some("stop"));
        assert_eq!(map_finish_reason("BLOCKLIST"), None);
    }

    #[test]
    fn unmapped_reason_defaults_to_stop() {
        let ids = FixedIds::new(5_000, "chatcmpl-x");
        let out = to_chat_response_with_ids(
            &json!({"candidates": [{"content": {"parts": [{"text": "hi"}]}, "finishReason": "SPII"}]}),
            "gemini-2.5-pro",
            &ids,
        );
        assert_eq!(out.choices[0].finish_reason.as_deref(), Some("stop"));
        assert_eq!(out.created, 5);
    }

    #[test]
    fn missing_candidates_produce_empty_message() {
        let ids = FixedIds::new(0, "chatcmpl-empty");
        let out = to_chat_response_with_ids(&json!({"candidates": []}), "m", &ids);
        assert_eq!(out.choices.len(), 1);
        assert_eq!(out.choices[0].message.content.as_deref(), Some(""));
        assert_eq!(out.choices[0].finish_reason.as_deref(), Some("stop"));

        let out = to_chat_response_with_ids(&json!("garbage"), "m", &ids);
        assert_eq!(out.choices[0].message.content.as_deref(), Some(""));
    }
}
