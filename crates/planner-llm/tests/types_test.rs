use planner_llm::{Content, Message, Tool, ToolCall, ToolChoice};
use serde_json::json;

#[test]
fn test_content_from_string() {
    let content: Content = "Test".into();
    assert_eq!(content.as_text(), Some("Test"));
}

#[test]
fn test_multipart_content_flattens() {
    let content: Content = serde_json::from_value(json!([
        { "type": "text", "text": "first" },
        { "type": "text", "text": "second" }
    ]))
    .unwrap();

    assert_eq!(content.as_text(), None);
    assert_eq!(content.to_text(), "first\nsecond");
}

#[test]
fn test_message_roles() {
    assert_eq!(Message::system("You are helpful").role(), "system");
    assert_eq!(Message::human("Hello").role(), "user");
    assert_eq!(Message::ai("Hi there!").role(), "assistant");
    assert_eq!(Message::tool_result("call_123", "42").role(), "tool");
}

#[test]
fn test_message_serialization_human() {
    let msg = Message::human("Hello");
    let json = serde_json::to_string(&msg).unwrap();
    assert!(json.contains("\"role\":\"user\""));
    assert!(json.contains("Hello"));
}

#[test]
fn test_tool_calls_accessor() {
    let call = ToolCall::new("call_1", "Search", &json!({ "query": "acme competitors" }));
    let msg = Message::ai_with_tools(vec![call]);

    assert!(msg.is_ai());
    assert_eq!(msg.tool_calls().len(), 1);
    assert_eq!(msg.tool_calls()[0].name(), "Search");
    assert!(Message::human("x").tool_calls().is_empty());
    assert_eq!(msg.text(), "");
}

#[test]
fn test_tool_call_arguments() {
    let call = ToolCall::new("call_1", "ScrapeWebsite", &json!({ "url": "https://acme.com" }));
    let args = call.arguments_value().unwrap();
    assert_eq!(args["url"], "https://acme.com");

    let mut empty = call.clone();
    empty.arguments = String::new();
    assert_eq!(empty.arguments_value().unwrap(), json!({}));
}

#[test]
fn test_tool_serialization() {
    let tool = Tool::new(
        "Search",
        "Search the web",
        json!({ "type": "object", "properties": { "query": { "type": "string" } } }),
    );

    let json = serde_json::to_value(&tool).unwrap();
    assert_eq!(json["type"], "function");
    assert_eq!(json["function"]["name"], "Search");
}

#[test]
fn test_tool_choice_serialization() {
    assert_eq!(serde_json::to_value(ToolChoice::required()).unwrap(), json!("required"));
    assert_eq!(
        serde_json::to_value(ToolChoice::force("MarketingPlan")).unwrap(),
        json!({ "type": "function", "function": { "name": "MarketingPlan" } })
    );
}
