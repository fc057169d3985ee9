use futures::StreamExt;
use planner_llm::{
    AnthropicClient, ChatClient, ChatOptions, ChatRequest, EmbeddingClient, Message, OpenAIClient,
    ProviderRegistry, ProviderType, StreamEvent, Tool, ToolChoice,
};
use serde_json::json;
use std::sync::Arc;

fn search_tool() -> Tool {
    Tool::new(
        "Search",
        "Search the web",
        json!({ "type": "object", "properties": { "query": { "type": "string" } }, "required": ["query"] }),
    )
}

#[tokio::test]
async fn test_openai_chat_parses_tool_calls() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .match_header("authorization", "Bearer test-key")
        .match_body(mockito::Matcher::PartialJson(json!({
            "model": "gpt-4o",
            "tool_choice": "required",
            "stream": false
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": "chatcmpl-1",
                "object": "chat.completion",
                "created": 1,
                "model": "gpt-4o",
                "choices": [{
                    "index": 0,
                    "message": {
                        "role": "assistant",
                        "content": null,
                        "tool_calls": [{
                            "id": "call_1",
                            "type": "function",
                            "function": { "name": "Search", "arguments": "{\"query\":\"acme\"}" }
                        }]
                    },
                    "finish_reason": "tool_calls"
                }],
                "usage": { "prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15 }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = OpenAIClient::new("test-key").unwrap().with_base_url(server.url());
    let request = ChatRequest::new("gpt-4o", vec![Message::human("find acme")]).with_options(
        ChatOptions::new()
            .tools(vec![search_tool()])
            .tool_choice(ToolChoice::required()),
    );

    let response = client.chat(request).await.unwrap();

    mock.assert_async().await;
    assert_eq!(response.tool_call("Search").unwrap().id, "call_1");
    assert_eq!(response.usage.unwrap().total_tokens, 15);
    assert_eq!(response.finish_reason.as_deref(), Some("tool_calls"));
}

#[tokio::test]
async fn test_openai_error_status_is_reported() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(401)
        .with_body("{\"error\":{\"message\":\"bad key\"}}")
        .create_async()
        .await;

    let client = OpenAIClient::new("wrong").unwrap().with_base_url(server.url());
    let err = client
        .chat(ChatRequest::new("gpt-4o", vec![Message::human("hi")]))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("OpenAI API error (401"));
}

#[tokio::test]
async fn test_openai_embeddings_keep_input_order() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/embeddings")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "data": [
                    { "index": 1, "embedding": [0.0, 1.0] },
                    { "index": 0, "embedding": [1.0, 0.0] }
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = OpenAIClient::new("k").unwrap().with_base_url(server.url());
    let vectors = client
        .embed("text-embedding-3-small", vec!["a".into(), "b".into()])
        .await
        .unwrap();

    assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
}

#[tokio::test]
async fn test_anthropic_chat_maps_tool_use() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/messages")
        .match_header("x-api-key", "anthropic-key")
        .match_header("anthropic-version", "2023-06-01")
        .match_body(mockito::Matcher::PartialJson(json!({
            "model": "claude-3-5-sonnet-20240620",
            "system": "plan things"
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": "msg_1",
                "type": "message",
                "role": "assistant",
                "content": [
                    { "type": "text", "text": "Let me search." },
                    { "type": "tool_use", "id": "toolu_1", "name": "Search", "input": { "query": "acme" } }
                ],
                "stop_reason": "tool_use",
                "usage": { "input_tokens": 20, "output_tokens": 7 }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = AnthropicClient::new("anthropic-key").unwrap().with_base_url(server.url());
    let request = ChatRequest::new(
        "claude-3-5-sonnet-20240620",
        vec![Message::system("plan things"), Message::human("go")],
    )
    .with_options(ChatOptions::new().tools(vec![search_tool()]));

    let response = client.chat(request).await.unwrap();

    mock.assert_async().await;
    assert_eq!(response.content.as_deref(), Some("Let me search."));
    let call = response.tool_call("Search").unwrap();
    assert_eq!(call.arguments_value().unwrap()["query"], "acme");
    assert_eq!(response.finish_reason.as_deref(), Some("tool_calls"));
    assert_eq!(response.usage.unwrap().total_tokens, 27);
}

#[tokio::test]
async fn test_anthropic_stream() {
    let body = concat!(
        "event: message_start\n",
        "data: {\"type\":\"message_start\",\"message\":{\"id\":\"msg_1\"}}\n\n",
        "event: content_block_start\n",
        "data: {\"type\":\"content_block_start\",\"index\":0,\"content_block\":{\"type\":\"tool_use\",\"id\":\"toolu_9\",\"name\":\"AskUserInput\",\"input\":{}}}\n\n",
        "event: content_block_delta\n",
        "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"input_json_delta\",\"partial_json\":\"{\\\"question\\\":\\\"Budget?\\\"}\"}}\n\n",
        "event: message_delta\n",
        "data: {\"type\":\"message_delta\",\"delta\":{\"stop_reason\":\"tool_use\"}}\n\n",
        "event: message_stop\n",
        "data: {\"type\":\"message_stop\"}\n\n",
    );

    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/messages")
        .match_body(mockito::Matcher::PartialJson(json!({ "stream": true })))
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(body)
        .create_async()
        .await;

    let client = AnthropicClient::new("k").unwrap().with_base_url(server.url());
    let stream = client
        .chat_stream(ChatRequest::new("claude-3-haiku", vec![Message::human("hi")]))
        .await
        .unwrap();

    let events: Vec<StreamEvent> = stream.map(|e| e.unwrap()).collect().await;
    assert_eq!(events.len(), 3);
    assert_eq!(
        events.last().unwrap(),
        &StreamEvent::Done { finish_reason: Some("tool_calls".to_string()) }
    );
}

#[tokio::test]
async fn test_registry_strips_provider_prefix() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .match_body(mockito::Matcher::PartialJson(json!({ "model": "gpt-4o-mini" })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "choices": [{
                    "index": 0,
                    "message": { "role": "assistant", "content": "hello" },
                    "finish_reason": "stop"
                }]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let openai = OpenAIClient::new("k").unwrap().with_base_url(server.url());
    let registry = ProviderRegistry::new().with_client(ProviderType::OpenAI, Arc::new(openai));

    let response = registry
        .chat(ChatRequest::new("openai/gpt-4o-mini", vec![Message::human("hi")]))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(response.content.as_deref(), Some("hello"));
}
