use anyhow::Result;
use async_trait::async_trait;
use planner_llm::{ChatClient, ChatRequest, ChatResponse, ChatStream};
use planner_tools::{
    research_tools, AnalyzeWebsite, MemoryConfig, MemoryStore, ScrapeWebsite, Search, Tool, ToolContext, ToolExecutor,
    WebFetcher,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

/// Records prompts and answers with a fixed reply
struct RecordingModel {
    prompts: Mutex<Vec<String>>,
    reply: String,
}

impl RecordingModel {
    fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            prompts: Mutex::new(Vec::new()),
            reply: reply.to_string(),
        })
    }
}

#[async_trait]
impl ChatClient for RecordingModel {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let prompt = request.messages.iter().map(|m| m.text()).collect::<Vec<_>>().join("\n");
        self.prompts.lock().unwrap().push(prompt);
        Ok(ChatResponse {
            content: Some(self.reply.clone()),
            tool_calls: None,
            usage: None,
            finish_reason: Some("stop".to_string()),
            raw: Value::Null,
        })
    }

    async fn chat_stream(&self, _request: ChatRequest) -> Result<ChatStream> {
        anyhow::bail!("streaming not scripted")
    }
}

#[tokio::test]
async fn test_search_calls_tavily_with_max_results() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/search")
        .match_body(mockito::Matcher::PartialJson(json!({
            "query": "acme coffee competitors",
            "max_results": 2
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "query": "acme coffee competitors",
                "results": [
                    { "url": "https://a.com", "title": "A", "content": "Roaster A", "score": 0.9 },
                    { "url": "https://b.com", "title": "B", "content": "Roaster B", "score": 0.8 },
                    { "url": "https://c.com", "title": "C", "content": "Roaster C", "score": 0.7 }
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let search = Search::new("tvly-test").with_base_url(server.url());
    let ctx = ToolContext::new("openai/gpt-4o").with_max_search_results(2);

    let out = search.call(json!({ "query": "acme coffee competitors" }), &ctx).await.unwrap();

    mock.assert_async().await;
    let results: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(results.as_array().unwrap().len(), 2);
    assert_eq!(results[0]["url"], "https://a.com");
}

#[tokio::test]
async fn test_search_requires_query() {
    let search = Search::new("k");
    let err = search.call(json!({}), &ToolContext::new("m")).await.unwrap_err();
    assert!(err.to_string().contains("query"));
}

#[tokio::test]
async fn test_scrape_converts_html_and_prompts_with_plan() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/")
        .with_status(200)
        .with_header("content-type", "text/html; charset=utf-8")
        .with_body("<html><body><h1>Acme Roasters</h1><p>Single origin beans</p></body></html>")
        .create_async()
        .await;

    let model = RecordingModel::new("Notes: specialty coffee");
    let tool = ScrapeWebsite::new(WebFetcher::new().unwrap(), model.clone());
    let ctx = ToolContext::new("openai/gpt-4o")
        .with_marketing_plan(Some(json!({ "recommended_channels": ["Instagram"] })));

    let out = tool.call(json!({ "url": server.url() }), &ctx).await.unwrap();

    assert_eq!(out, "Notes: specialty coffee");
    let prompts = model.prompts.lock().unwrap();
    assert!(prompts[0].contains("You just scraped the following website"));
    assert!(prompts[0].contains("Acme Roasters"));
    assert!(!prompts[0].contains("<h1>"));
    assert!(prompts[0].contains("Instagram"));
}

#[tokio::test]
async fn test_analyze_runs_two_model_passes() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/")
        .with_status(200)
        .with_header("content-type", "text/plain")
        .with_body("We sell handmade candles to eco-conscious shoppers.")
        .create_async()
        .await;

    let model = RecordingModel::new("analysis");
    let tool = AnalyzeWebsite::new(WebFetcher::new().unwrap(), model.clone());

    let out = tool
        .call(json!({ "url": server.url() }), &ToolContext::new("openai/gpt-4o"))
        .await
        .unwrap();

    assert_eq!(out, "analysis");
    let prompts = model.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[1].contains("1. Industry/Niche"));
}

#[tokio::test]
async fn test_fetch_error_status() {
    let mut server = mockito::Server::new_async().await;
    server.mock("GET", "/").with_status(404).create_async().await;

    let executor = ToolExecutor::new().with_tool(Arc::new(ScrapeWebsite::new(
        WebFetcher::new().unwrap(),
        RecordingModel::new("unused"),
    )));

    let err = executor
        .execute_tool("ScrapeWebsite", json!({ "url": server.url() }), &ToolContext::new("m"))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("404"));
}

#[test]
fn test_research_tools_offer_search_only_with_backend() {
    let memory = Arc::new(MemoryStore::new(MemoryConfig::default()));

    let without = research_tools(RecordingModel::new("x"), memory.clone(), None).unwrap();
    assert_eq!(
        without.list_tools(),
        vec!["ScrapeWebsite", "AnalyzeWebsite", "ManageMemory", "SearchMemory"]
    );

    let with = research_tools(RecordingModel::new("x"), memory, Some(Search::new("key"))).unwrap();
    assert_eq!(with.list_tools()[0], "Search");
    assert_eq!(with.list_tools().len(), 5);
}
