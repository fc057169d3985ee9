//! LangChain-shaped messages and state values, as chat clients of the
//! development server send and expect them.

use std::collections::HashMap;

use planner_llm::{Content, Message, ToolCall};
use planner_types::PlannerState;
use serde_json::{json, Map, Value};

use crate::error::{ApiError, ApiResult};

/// Parse one client message; the kind comes from `type` or, failing that, `role`
pub fn from_wire(value: &Value) -> ApiResult<Message> {
    let kind = value
        .get("type")
        .or_else(|| value.get("role"))
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::BadRequest("message is missing 'type' or 'role'".to_string()))?;

    let content = content_text(value.get("content").unwrap_or(&Value::Null));

    let message = match kind {
        "human" | "user" => Message::human(content),
        "system" => Message::system(content),
        "ai" | "assistant" => {
            let tool_calls = wire_tool_calls(value)?;
            Message::AI {
                content: (!content.is_empty()).then(|| Content::text(content)),
                tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
                name: None,
                id: None,
            }
        }
        "tool" => {
            let tool_call_id = value
                .get("tool_call_id")
                .and_then(Value::as_str)
                .ok_or_else(|| ApiError::BadRequest("tool message is missing 'tool_call_id'".to_string()))?;
            Message::tool_result(tool_call_id, content)
        }
        other => return Err(ApiError::BadRequest(format!("unsupported message type: {}", other))),
    };

    // keep the client's id so the turn is recognisable in later state reads
    match value.get("id").and_then(Value::as_str).filter(|id| !id.is_empty()) {
        Some(id) => Ok(message.with_id(id)),
        None => Ok(message),
    }
}

/// Parse the `messages` array of a run input; a bare string is one human message
pub fn messages_from_wire(value: Option<&Value>) -> ApiResult<Vec<Message>> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(text)) => Ok(vec![Message::human(text.as_str())]),
        Some(Value::Array(items)) => items.iter().map(from_wire).collect(),
        Some(_) => Err(ApiError::BadRequest("'messages' must be an array".to_string())),
    }
}

/// String content, or the text parts of a content array joined by newlines
fn content_text(content: &Value) -> String {
    match content {
        Value::String(text) => text.clone(),
        Value::Array(parts) => parts
            .iter()
            .filter_map(|part| match part {
                Value::String(text) => Some(text.as_str()),
                _ => part.get("text").and_then(Value::as_str),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    }
}

fn wire_tool_calls(value: &Value) -> ApiResult<Vec<ToolCall>> {
    let Some(calls) = value.get("tool_calls").and_then(Value::as_array) else {
        return Ok(Vec::new());
    };

    calls
        .iter()
        .map(|call| {
            let id = call.get("id").and_then(Value::as_str).unwrap_or_default();
            let name = call
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| ApiError::BadRequest("tool call is missing 'name'".to_string()))?;
            let args = call.get("args").cloned().unwrap_or_else(|| json!({}));
            Ok(ToolCall::new(id, name, &args))
        })
        .collect()
}

/// Render a message in the LangChain shape. Tool results need the call's name,
/// which lives on the assistant message that made the call.
pub fn to_wire(message: &Message, id: &str, call_names: &HashMap<String, String>) -> Value {
    match message {
        Message::System { content, .. } => json!({
            "type": "system",
            "id": id,
            "content": content.to_text(),
        }),
        Message::Human { content, .. } => json!({
            "type": "human",
            "id": id,
            "content": content.to_text(),
        }),
        Message::AI { .. } => {
            let tool_calls: Vec<Value> = message
                .tool_calls()
                .iter()
                .map(|call| {
                    json!({
                        "id": call.id,
                        "name": call.name(),
                        "args": call.arguments_value().unwrap_or_else(|_| json!({})),
                        "type": "tool_call",
                    })
                })
                .collect();

            json!({
                "type": "ai",
                "id": id,
                "content": message.text(),
                "tool_calls": tool_calls,
            })
        }
        Message::Tool { tool_call_id, content, .. } => json!({
            "type": "tool",
            "id": id,
            "content": content.to_text(),
            "tool_call_id": tool_call_id,
            "name": call_names.get(tool_call_id),
        }),
    }
}

/// Map of tool call id to tool name across a transcript
pub fn call_names(messages: &[Message]) -> HashMap<String, String> {
    messages
        .iter()
        .flat_map(|m| m.tool_calls())
        .map(|call| (call.id.clone(), call.name().to_string()))
        .collect()
}

/// Transcript in wire shape. Messages carry their own id; turns stored
/// without one get a positional "msg-N".
pub fn messages_to_wire(messages: &[Message]) -> Vec<Value> {
    let names = call_names(messages);
    messages
        .iter()
        .enumerate()
        .map(|(idx, message)| {
            let id = message.id().map(str::to_string).unwrap_or_else(|| format!("msg-{}", idx));
            to_wire(message, &id, &names)
        })
        .collect()
}

/// Thread values as clients read them: the state fields with wire messages
pub fn state_values(state: &PlannerState) -> Value {
    let mut values = match serde_json::to_value(state) {
        Ok(Value::Object(map)) => map,
        Ok(_) | Err(_) => {
            tracing::warn!(run_id = %state.run_id, "state did not serialize to an object");
            Map::new()
        }
    };
    values.insert("messages".to_string(), Value::Array(messages_to_wire(&state.messages)));
    Value::Object(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use planner_types::RunConfig;

    #[test]
    fn test_from_wire_accepts_type_or_role() {
        let human = from_wire(&json!({ "type": "human", "content": "hi" })).unwrap();
        assert_eq!(human, Message::human("hi"));

        let user = from_wire(&json!({ "role": "user", "content": [{ "type": "text", "text": "a" }, "b"] })).unwrap();
        assert_eq!(user.text(), "a\nb");

        assert!(from_wire(&json!({ "content": "no kind" })).is_err());
        assert!(from_wire(&json!({ "type": "function", "content": "x" })).is_err());
    }

    #[test]
    fn test_ai_tool_calls_round_trip_through_wire() {
        let wire = json!({
            "type": "ai",
            "content": "",
            "tool_calls": [{ "id": "c1", "name": "Search", "args": { "query": "coffee" } }]
        });
        let message = from_wire(&wire).unwrap();
        assert_eq!(message.tool_calls()[0].name(), "Search");

        let names = call_names(std::slice::from_ref(&message));
        let out = to_wire(&message, "msg-0", &names);
        assert_eq!(out["tool_calls"][0]["args"]["query"], "coffee");

        let result = to_wire(&Message::tool_result("c1", "[]"), "msg-1", &names);
        assert_eq!(result["type"], "tool");
        assert_eq!(result["name"], "Search");
    }

    #[test]
    fn test_messages_from_wire_shapes() {
        assert!(messages_from_wire(None).unwrap().is_empty());
        assert_eq!(messages_from_wire(Some(&json!("hello"))).unwrap().len(), 1);
        assert!(messages_from_wire(Some(&json!({ "type": "human" }))).is_err());
    }

    #[test]
    fn test_state_values_use_wire_messages() {
        let mut state = PlannerState::new("t1", RunConfig::default());
        state.add_message(Message::human("plan for https://acme.com"));
        state.add_message(Message::ai("ok"));

        let values = state_values(&state);
        assert_eq!(values["messages"][0]["type"], "human");
        assert_eq!(values["messages"][1]["id"], state.messages[1].id().unwrap());
        assert_eq!(values["loop_step"], 0);
    }
}
