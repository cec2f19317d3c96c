use chat2gemini::models::chat::{
    ChatCompletionRequest, ChatMessage, FunctionCall, FunctionDef, Role, ToolCall, ToolDefinition,
};
use chat2gemini::models::gemini::{ContentRole, FunctionCallingMode, ThinkingLevel};
use chat2gemini::{to_gemini_body, to_gemini_request, to_gemini_request_with_config};
use chat2gemini::{BridgeError, TranslationConfig};
use serde_json::{json, Value};

fn user(text: &str) -> ChatMessage {
    ChatMessage::text(Role::User, text)
}

#[test]
fn consecutive_user_messages_are_merged_in_order() {
    let req = ChatCompletionRequest {
        model: "gemini-2.5-flash".into(),
        messages: vec![user("one"), user("two"), user("three")],
        ..Default::default()
    };

    let out = to_gemini_request(&req);
    assert_eq!(out.contents.len(), 1);
    assert_eq!(out.contents[0].role, Some(ContentRole::User));
    let texts: Vec<_> = out.contents[0]
        .parts
        .iter()
        .map(|p| p.text.as_deref().unwrap_or_default())
        .collect();
    assert_eq!(texts, vec!["one", "two", "three"]);
}

#[test]
fn roles_alternate_after_translation() {
    let req = ChatCompletionRequest {
        model: "gemini-2.5-flash".into(),
        messages: vec![
            ChatMessage::text(Role::System, "be brief"),
            user("hi"),
            ChatMessage::text(Role::Assistant, "hello"),
            ChatMessage::text(Role::Assistant, "anything else?"),
            user("no"),
        ],
        ..Default::default()
    };

    let out = to_gemini_request(&req);
    let roles: Vec<_> = out.contents.iter().map(|c| c.role).collect();
    assert_eq!(
        roles,
        vec![
            Some(ContentRole::User),
            Some(ContentRole::Model),
            Some(ContentRole::User)
        ]
    );
    assert_eq!(out.contents[1].parts.len(), 2);
}

#[test]
fn empty_messages_produce_no_content() {
    let req = ChatCompletionRequest {
        model: "gemini-2.5-flash".into(),
        messages: vec![
            user(""),
            ChatMessage {
                role: Role::Assistant,
                content: Value::Null,
                ..Default::default()
            },
            user("real"),
        ],
        ..Default::default()
    };
    let out = to_gemini_request(&req);
    assert_eq!(out.contents.len(), 1);
    assert_eq!(out.contents[0].parts.len(), 1);
}

#[test]
fn multipart_user_content_keeps_text_only() {
    let req = ChatCompletionRequest {
        model: "gemini-2.5-flash".into(),
        messages: vec![ChatMessage {
            role: Role::User,
            content: json!([
                {"type": "text", "text": "describe"},
                {"type": "image_url", "image_url": {"url": "https://example.com/x.png"}},
                {"type": "text", "text": "briefly"}
            ]),
            ..Default::default()
        }],
        ..Default::default()
    };
    let out = to_gemini_request(&req);
    let texts: Vec<_> = out.contents[0]
        .parts
        .iter()
        .filter_map(|p| p.text.as_deref())
        .collect();
    assert_eq!(texts, vec!["describe", "briefly"]);
}

#[test]
fn unparseable_tool_result_is_wrapped() {
    let req = ChatCompletionRequest {
        model: "gemini-2.5-pro".into(),
        messages: vec![ChatMessage {
            role: Role::Tool,
            content: json!("plain text, not json"),
            name: Some("search".into()),
            tool_call_id: Some("call_1".into()),
            tool_calls: None,
        }],
        ..Default::default()
    };

    let out = to_gemini_request(&req);
    assert_eq!(out.contents[0].role, Some(ContentRole::User));
    let resp = out.contents[0].parts[0]
        .function_response
        .as_ref()
        .expect("function response part");
    assert_eq!(resp.name, "search");
    assert_eq!(resp.response, json!({"content": "plain text, not json"}));
}

#[test]
fn json_tool_result_is_parsed() {
    let req = ChatCompletionRequest {
        model: "gemini-2.5-pro".into(),
        messages: vec![ChatMessage {
            role: Role::Tool,
            content: json!(r#"{"hits": 3}"#),
            name: Some("search".into()),
            ..Default::default()
        }],
        ..Default::default()
    };
    let out = to_gemini_request(&req);
    let resp = out.contents[0].parts[0].function_response.as_ref().unwrap();
    assert_eq!(resp.response, json!({"hits": 3}));
}

#[test]
fn invalid_tool_call_arguments_become_empty_object() {
    let req = ChatCompletionRequest {
        model: "gemini-2.5-pro".into(),
        messages: vec![
            user("go"),
            ChatMessage {
                role: Role::Assistant,
                content: json!("calling"),
                tool_calls: Some(vec![ToolCall {
                    id: "call_a".into(),
                    call_type: "function".into(),
                    function: FunctionCall {
                        name: "run".into(),
                        arguments: "{broken".into(),
                    },
                }]),
                ..Default::default()
            },
        ],
        ..Default::default()
    };

    let out = to_gemini_request(&req);
    let model_turn = &out.contents[1];
    assert_eq!(model_turn.role, Some(ContentRole::Model));
    assert_eq!(model_turn.parts[0].text.as_deref(), Some("calling"));
    let call = model_turn.parts[1].function_call.as_ref().unwrap();
    assert_eq!(call.name, "run");
    assert_eq!(call.args, json!({}));
}

#[test]
fn fallback_tool_result_name_is_configurable() {
    let config = TranslationConfig {
        tool_result_fallback_name: "tool_output".into(),
        ..Default::default()
    };
    let req = ChatCompletionRequest {
        model: "gemini-2.5-pro".into(),
        messages: vec![ChatMessage {
            role: Role::Tool,
            content: json!("done"),
            ..Default::default()
        }],
        ..Default::default()
    };
    let out = to_gemini_request_with_config(&req, &config);
    let resp = out.contents[0].parts[0].function_response.as_ref().unwrap();
    assert_eq!(resp.name, "tool_output");
}

#[test]
fn end_to_end_thinking_heuristic() {
    let plain = to_gemini_body(br#"{"model":"gemini-3-pro","messages":[{"role":"user","content":"hi"}]}"#)
        .unwrap();
    assert!(plain["generationConfig"].get("thinkingConfig").is_none());
    assert!(plain["generationConfig"].get("maxOutputTokens").is_none());
    assert_eq!(plain["generationConfig"]["candidateCount"], 1);

    let thinking = to_gemini_body(
        br#"{"model":"gemini-3-pro-thinking","messages":[{"role":"user","content":"hi"}]}"#,
    )
    .unwrap();
    let generation = &thinking["generationConfig"];
    assert_eq!(generation["thinkingConfig"]["thinkingLevel"], "medium");
    assert_eq!(generation["thinkingConfig"]["includeThoughts"], true);
    assert!(generation["thinkingConfig"].get("thinkingBudget").is_none());
    assert_eq!(generation["maxOutputTokens"], 65535);
}

#[test]
fn thinking_level_comes_from_config() {
    let config = TranslationConfig {
        thinking_level: ThinkingLevel::Low,
        include_thoughts: false,
        ..Default::default()
    };
    let req = ChatCompletionRequest {
        model: "Gemini-3-Pro-Thinking".into(),
        messages: vec![user("hi")],
        max_tokens: Some(9000),
        ..Default::default()
    };
    let out = to_gemini_request_with_config(&req, &config);
    let generation = out.generation_config.unwrap();
    let thinking = generation.thinking_config.unwrap();
    assert_eq!(thinking.thinking_level, Some(ThinkingLevel::Low));
    assert_eq!(thinking.include_thoughts, None);
    assert_eq!(generation.max_output_tokens, Some(9000));
}

#[test]
fn stop_is_normalized_to_list() {
    let single = to_gemini_body(br####"{"model":"m","messages":[],"stop":"###"}"####).unwrap();
    assert_eq!(single["generationConfig"]["stopSequences"], json!(["###"]));

    let list = to_gemini_body(br#"{"model":"m","messages":[],"stop":["a","b"]}"#).unwrap();
    assert_eq!(list["generationConfig"]["stopSequences"], json!(["a", "b"]));
}

#[test]
fn max_completion_tokens_is_used_when_max_tokens_absent() {
    let body = to_gemini_body(br#"{"model":"m","messages":[],"max_completion_tokens":512}"#)
        .unwrap();
    assert_eq!(body["generationConfig"]["maxOutputTokens"], 512);
}

#[test]
fn serialized_body_uses_gemini_field_names() {
    let req = ChatCompletionRequest {
        model: "gemini-2.5-pro".into(),
        messages: vec![ChatMessage::text(Role::System, "sys"), user("hi")],
        tools: Some(vec![ToolDefinition::Function {
            function: FunctionDef {
                name: "noop".into(),
                description: None,
                parameters: None,
            },
        }]),
        tool_choice: Some(json!("required")),
        ..Default::default()
    };
    let body = serde_json::to_value(to_gemini_request(&req)).unwrap();

    assert_eq!(body["systemInstruction"], json!({"parts": [{"text": "sys"}]}));
    assert_eq!(body["contents"], json!([{"role": "user", "parts": [{"text": "hi"}]}]));
    assert_eq!(body["toolConfig"]["functionCallingConfig"]["mode"], "ANY");

    let decl = &body["tools"][0]["functionDeclarations"][0];
    assert_eq!(decl["name"], "noop");
    assert!(decl.get("description").is_none());
    assert_eq!(decl["parameters"]["type"], "OBJECT");
    assert_eq!(decl["parameters"]["required"], json!(["_placeholder"]));
}

#[test]
fn tool_choice_auto_and_none() {
    for (choice, mode) in [("auto", FunctionCallingMode::Auto), ("none", FunctionCallingMode::None)] {
        let req = ChatCompletionRequest {
            model: "m".into(),
            messages: vec![user("x")],
            tool_choice: Some(json!(choice)),
            ..Default::default()
        };
        let out = to_gemini_request(&req);
        assert_eq!(out.tool_config.unwrap().function_calling_config.mode, mode);
    }
}

#[test]
fn invalid_body_is_rejected() {
    let err = to_gemini_body(b"[1, 2, 3]").unwrap_err();
    assert!(matches!(err, BridgeError::InvalidRequest(_)));
    assert!(err.to_string().starts_with("invalid chat completion request"));
}
