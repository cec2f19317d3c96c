use chat2gemini::{to_chat_response, to_chat_response_with_ids, FixedIds};
use serde_json::json;

#[test]
fn text_parts_are_concatenated() {
    let ids = FixedIds::new(1_700_000_000_123, "chatcmpl-fixed");
    let upstream = json!({
        "candidates": [{
            "content": {"role": "model", "parts": [
                {"text": "Hello"},
                {"text": ""},
                {"text": ", world"}
            ]},
            "finishReason": "STOP"
        }, {
            "content": {"parts": [{"text": "ignored second candidate"}]}
        }]
    });

    let out = to_chat_response_with_ids(&upstream, "gemini-2.5-flash", &ids);
    assert_eq!(out.id, "chatcmpl-fixed");
    assert_eq!(out.object, "chat.completion");
    assert_eq!(out.created, 1_700_000_000);
    assert_eq!(out.model, "gemini-2.5-flash");
    assert_eq!(out.choices.len(), 1);
    assert_eq!(out.choices[0].message.role, "assistant");
    assert_eq!(out.choices[0].message.content.as_deref(), Some("Hello, world"));
    assert!(out.choices[0].message.tool_calls.is_none());
    assert_eq!(out.choices[0].finish_reason.as_deref(), Some("stop"));

    let usage = out.usage.expect("usage");
    assert_eq!(
        (usage.prompt_tokens, usage.completion_tokens, usage.total_tokens),
        (0, 0, 0)
    );
}

#[test]
fn safety_maps_to_content_filter() {
    let out = to_chat_response(
        &json!({"candidates": [{"content": {"parts": []}, "finishReason": "SAFETY"}]}),
        "gemini-2.5-pro",
    );
    assert_eq!(out.choices[0].finish_reason.as_deref(), Some("content_filter"));
}

#[test]
fn max_tokens_maps_to_length() {
    let out = to_chat_response(
        &json!({"candidates": [{"content": {"parts": [{"text": "trunc"}]}, "finishReason": "MAX_TOKENS"}]}),
        "gemini-2.5-pro",
    );
    assert_eq!(out.choices[0].finish_reason.as_deref(), Some("length"));
}

#[test]
fn function_calls_become_tool_calls() {
    let ids = FixedIds::new(42_000, "chatcmpl-tools");
    let upstream = json!({
        "candidates": [{
            "content": {"role": "model", "parts": [
                {"functionCall": {"name": "get_weather", "args": {"city": "Paris"}}},
                {"functionCall": {"name": "get_time", "args": {}}}
            ]},
            "finishReason": "STOP"
        }]
    });

    let out = to_chat_response_with_ids(&upstream, "gemini-2.5-pro", &ids);
    let message = &out.choices[0].message;
    assert_eq!(message.content, None);
    let calls = message.tool_calls.as_ref().expect("tool calls");
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].id, "call_42000_0");
    assert_eq!(calls[0].call_type, "function");
    assert_eq!(calls[0].function.name, "get_weather");
    assert_eq!(
        serde_json::from_str::<serde_json::Value>(&calls[0].function.arguments).unwrap(),
        json!({"city": "Paris"})
    );
    assert_eq!(calls[1].id, "call_42000_1");
    assert_eq!(calls[1].function.arguments, "{}");
}

#[test]
fn thought_text_is_kept_and_signatures_ignored() {
    let out = to_chat_response(
        &json!({"candidates": [{"content": {"parts": [
            {"text": "pondering. ", "thought": true},
            {"text": "Answer.", "thoughtSignature": "c2ln"}
        ]}}]}),
        "gemini-3-pro",
    );
    assert_eq!(
        out.choices[0].message.content.as_deref(),
        Some("pondering. Answer.")
    );
}

#[test]
fn envelope_is_unwrapped() {
    let upstream = json!({
        "response": {
            "candidates": [{"content": {"parts": [{"text": "wrapped"}]}, "finishReason": "RECITATION"}]
        },
        "traceId": "abc"
    });
    let out = to_chat_response(&upstream, "gemini-2.5-pro");
    assert_eq!(out.choices[0].message.content.as_deref(), Some("wrapped"));
    assert_eq!(out.choices[0].finish_reason.as_deref(), Some("content_filter"));
}

#[test]
fn serialized_response_matches_chat_shape() {
    let ids = FixedIds::new(3_000, "chatcmpl-json");
    let out = to_chat_response_with_ids(
        &json!({"candidates": [{"content": {"parts": [{"text": "ok"}]}, "finishReason": "OTHER"}]}),
        "gemini-2.5-flash",
        &ids,
    );
    let body = serde_json::to_value(&out).unwrap();
    assert_eq!(
        body,
        json!({
            "id": "chatcmpl-json",
            "object": "chat.completion",
            "created": 3,
            "model": "gemini-2.5-flash",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "ok"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 0, "completion_tokens": 0, "total_tokens": 0}
        })
    );
}
