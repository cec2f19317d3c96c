use crate::config::TranslationConfig;
use crate::error::BridgeError;
use crate::models::chat;
use crate::models::gemini::{
    Content, ContentRole, FunctionCallingConfig, FunctionCallingMode, FunctionDeclaration,
    GenerateContentRequest, GenerationConfig, Part, ThinkingConfig, ThinkingLevel, Tool,
    ToolConfig,
};
use crate::schema;
use serde_json::{json, Map, Value};

/// Decode a raw Chat Completions request body.
pub fn parse_chat_request(body: &[u8]) -> Result<chat::ChatCompletionRequest, BridgeError> {
    serde_json::from_slice(body).map_err(BridgeError::InvalidRequest)
}

/// Parse, convert and re-serialize a raw Chat Completions body in one step.
pub fn to_gemini_body(body: &[u8]) -> Result<Value, BridgeError> {
    let req = parse_chat_request(body)?;
    serde_json::to_value(to_gemini_request(&req)).map_err(|source| BridgeError::Serialize {
        what: "gemini request",
        source,
    })
}

/// Convert an OpenAI Chat Completions request into a Gemini `generateContent` body
/// using the default [`TranslationConfig`].
pub fn to_gemini_request(src: &chat::ChatCompletionRequest) -> GenerateContentRequest {
    to_gemini_request_with_config(src, &TranslationConfig::default())
}

/// Convert an OpenAI Chat Completions request into a Gemini `generateContent` body.
///
/// Mapping highlights:
/// - the first system message becomes `systemInstruction`; system messages never enter `contents`.
/// - assistant -> model, user -> user, tool results -> user turns with a `functionResponse` part.
/// - consecutive turns with the same role are merged, since Gemini requires alternation.
/// - function tools are kept with their parameters rewritten by [`schema::rewrite`].
/// - tool_choice -> `toolConfig.functionCallingConfig`.
/// - sampling parameters -> `generationConfig` (always `candidateCount: 1`), plus a
///   `thinkingConfig` for reasoning models.
pub fn to_gemini_request_with_config(
    src: &chat::ChatCompletionRequest,
    config: &TranslationConfig,
) -> GenerateContentRequest {
    let system_instruction = src
        .messages
        .iter()
        .find(|m| m.role == chat::Role::System)
        .map(|m| text_parts(&m.content))
        .filter(|parts| !parts.is_empty())
        .map(|parts| Content { role: None, parts });

    GenerateContentRequest {
        contents: map_messages(&src.messages, config),
        system_instruction,
        tools: map_tools(src.tools.as_deref()),
        tool_config: src.tool_choice.as_ref().and_then(map_tool_choice),
        generation_config: Some(map_generation_config(src, config)),
    }
}

fn map_messages(src: &[chat::ChatMessage], config: &TranslationConfig) -> Vec<Content> {
    let mut contents: Vec<Content> = Vec::new();
    for (pos, message) in src.iter().enumerate() {
        let Some(content) = map_message(message, &src[..pos], config) else {
            continue;
        };
        match contents.last_mut() {
            Some(prev) if prev.role == content.role => prev.parts.extend(content.parts),
            _ => contents.push(content),
        }
    }
    contents
}

fn map_message(
    m: &chat::ChatMessage,
    history: &[chat::ChatMessage],
    config: &TranslationConfig,
) -> Option<Content> {
    let (role, parts) = match m.role {
        chat::Role::System => return None,
        chat::Role::User => (ContentRole::User, text_parts(&m.content)),
        chat::Role::Assistant => {
            let mut parts = text_parts(&m.content);
            parts.extend(m.tool_calls.iter().flatten().map(map_tool_call));
            (ContentRole::Model, parts)
        }
        // Gemini has no tool role; results travel in user turns.
        chat::Role::Tool | chat::Role::Function => (
            ContentRole::User,
            vec![map_tool_result(m, history, config)],
        ),
    };
    if parts.is_empty() {
        None
    } else {
        Some(Content::new(role, parts))
    }
}

/// Text parts of a message. Non-text parts (images, audio) are not supported and dropped.
fn text_parts(content: &Value) -> Vec<Part> {
    match content {
        Value::String(s) if !s.is_empty() => vec![Part::text(s.as_str())],
        Value::Array(parts) => parts
            .iter()
            .filter_map(|p| {
                let kind = p.get("type").and_then(Value::as_str).unwrap_or("text");
                match (kind, p.get("text").and_then(Value::as_str)) {
                    ("text" | "input_text", Some(text)) if !text.is_empty() => {
                        Some(Part::text(text))
                    }
                    ("text" | "input_text", _) => None,
                    (other, _) => {
                        tracing::debug!(part_type = other, "dropping unsupported content part");
                        None
                    }
                }
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn map_tool_call(call: &chat::ToolCall) -> Part {
    let args = match serde_json::from_str::<Value>(&call.function.arguments) {
        Ok(v @ Value::Object(_)) => v,
        Ok(_) | Err(_) => {
            tracing::debug!(
                function = %call.function.name,
                len = call.function.arguments.len(),
                "tool call arguments are not a JSON object, sending empty args"
            );
            Value::Object(Map::new())
        }
    };
    Part::function_call(call.function.name.as_str(), args)
}

fn map_tool_result(
    m: &chat::ChatMessage,
    history: &[chat::ChatMessage],
    config: &TranslationConfig,
) -> Part {
    let response = match &m.content {
        Value::Object(_) => m.content.clone(),
        Value::String(s) => parse_tool_output(s),
        Value::Array(_) => {
            let text = text_parts(&m.content)
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("\n");
            parse_tool_output(&text)
        }
        other => json!({ "content": other }),
    };
    Part::function_response(tool_result_name(m, history, config), response)
}

fn parse_tool_output(s: &str) -> Value {
    match serde_json::from_str::<Value>(s) {
        Ok(v @ Value::Object(_)) => v,
        _ => json!({ "content": s }),
    }
}

/// Declared name, else the name of the assistant call with the same id, else the fallback.
fn tool_result_name(
    m: &chat::ChatMessage,
    history: &[chat::ChatMessage],
    config: &TranslationConfig,
) -> String {
    if let Some(name) = m.name.as_deref().filter(|n| !n.is_empty()) {
        return name.to_string();
    }
    let from_history = m.tool_call_id.as_deref().and_then(|id| {
        history
            .iter()
            .rev()
            .filter_map(|prev| prev.tool_calls.as_ref())
            .flatten()
            .find(|call| call.id == id)
            .map(|call| call.function.name.clone())
    });
    from_history.unwrap_or_else(|| {
        tracing::debug!(
            tool_call_id = ?m.tool_call_id,
            "tool result without a resolvable name, using fallback"
        );
        config.tool_result_fallback_name.clone()
    })
}

fn map_tools(tools: Option<&[chat::ToolDefinition]>) -> Option<Vec<Tool>> {
    let declarations: Vec<FunctionDeclaration> = tools
        .unwrap_or_default()
        .iter()
        .filter_map(|t| match t {
            chat::ToolDefinition::Function { function } => Some(map_function(function)),
            chat::ToolDefinition::Unsupported => {
                tracing::debug!("dropping non-function tool");
                None
            }
        })
        .collect();
    if declarations.is_empty() {
        None
    } else {
        Some(vec![Tool {
            function_declarations: declarations,
        }])
    }
}

fn map_function(function: &chat::FunctionDef) -> FunctionDeclaration {
    let mut parameters = function
        .parameters
        .clone()
        .unwrap_or_else(|| json!({ "type": "object" }));
    // Function parameters are always an object, even when the schema omits the type.
    if let Some(obj) = parameters.as_object_mut() {
        obj.entry("type").or_insert_with(|| json!("object"));
    }
    FunctionDeclaration {
        name: function.name.clone(),
        description: function.description.clone().filter(|d| !d.is_empty()),
        parameters: schema::rewrite(&parameters),
    }
}

fn map_tool_choice(choice: &Value) -> Option<ToolConfig> {
    let (mode, allowed) = match choice {
        Value::String(s) => match s.as_str() {
            "auto" => (FunctionCallingMode::Auto, None),
            "none" => (FunctionCallingMode::None, None),
            "required" => (FunctionCallingMode::Any, None),
            other => {
                tracing::warn!(tool_choice = other, "ignoring unknown tool_choice");
                return None;
            }
        },
        Value::Object(obj) => {
            let name = obj
                .get("function")
                .and_then(|f| f.get("name"))
                .and_then(Value::as_str)?;
            (FunctionCallingMode::Any, Some(vec![name.to_string()]))
        }
        _ => return None,
    };
    Some(ToolConfig {
        function_calling_config: FunctionCallingConfig {
            mode,
            allowed_function_names: allowed,
        },
    })
}

fn map_generation_config(
    src: &chat::ChatCompletionRequest,
    config: &TranslationConfig,
) -> GenerationConfig {
    let mut generation = GenerationConfig {
        temperature: src.temperature,
        top_p: src.top_p,
        max_output_tokens: src.output_token_cap(),
        stop_sequences: stop_sequences(src.stop.as_ref()),
        candidate_count: Some(1),
        thinking_config: None,
    };

    if let Some(thinking) = thinking_config(&src.model, src.reasoning_effort.as_deref(), config) {
        generation.thinking_config = Some(thinking);
        // The reasoning budget must not starve the visible output.
        if generation
            .max_output_tokens
            .map_or(true, |n| n < config.min_output_tokens_with_thinking)
        {
            generation.max_output_tokens = Some(config.thinking_output_tokens);
        }
    }
    generation
}

/// `stop` accepts a single string or a list; Gemini always wants a list.
fn stop_sequences(stop: Option<&Value>) -> Option<Vec<String>> {
    let list: Vec<String> = match stop? {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    };
    if list.is_empty() {
        None
    } else {
        Some(list)
    }
}

/// Thinking is enabled for model ids mentioning "thinking" or "opus", or when the
/// request carries a `reasoning_effort`. Gemini 3 takes a qualitative level, every
/// other model (Gemini 2.5 included) a token budget.
fn thinking_config(
    model: &str,
    reasoning_effort: Option<&str>,
    config: &TranslationConfig,
) -> Option<ThinkingConfig> {
    let model = model.to_ascii_lowercase();
    let effort = reasoning_effort.and_then(ThinkingLevel::parse);
    if !(model.contains("thinking") || model.contains("opus") || effort.is_some()) {
        return None;
    }

    let mut thinking = ThinkingConfig {
        include_thoughts: config.include_thoughts.then_some(true),
        ..Default::default()
    };
    if model.contains("gemini-3") {
        thinking.thinking_level = Some(effort.unwrap_or(config.thinking_level));
    } else {
        thinking.thinking_budget = Some(config.thinking_budget);
    }
    Some(thinking)
}
