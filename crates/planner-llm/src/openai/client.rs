// OpenAI Chat Completions and Embeddings over plain HTTP

use super::stream::OpenAIChatParser;
use crate::sse::decode_sse_response;
use crate::streaming::ChatStream;
use crate::traits::{ChatClient, ChatOptions, ChatRequest, ChatResponse, EmbeddingClient, TokenUsage};
use crate::types::{Message, ToolCall};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::{json, Map, Value};

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// OpenAI client (HTTP direct, no SDK)
pub struct OpenAIClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl OpenAIClient {
    /// Create new client with API key
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .context("Invalid API key format")?,
        );

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            base_url: OPENAI_API_BASE.to_string(),
        })
    }

    /// Point the client at a compatible endpoint (proxies, test servers)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build chat completion request payload
    pub(crate) fn build_chat_request(
        model: &str,
        messages: Vec<Message>,
        options: &ChatOptions,
        stream: bool,
    ) -> Result<Value> {
        let openai_messages: Vec<Value> = messages
            .into_iter()
            .map(Self::convert_message)
            .collect::<Result<Vec<_>>>()?;

        let mut obj = Map::new();
        obj.insert("model".to_string(), json!(model));
        obj.insert("messages".to_string(), json!(openai_messages));
        obj.insert("stream".to_string(), json!(stream));

        // o-series models reject temperature and use max_completion_tokens
        let is_reasoning_model = model.starts_with("o1") || model.starts_with("o3");

        if let Some(temp) = options.temperature {
            if !is_reasoning_model {
                obj.insert("temperature".to_string(), json!(temp));
            }
        }
        if let Some(max_tokens) = options.max_tokens {
            let token_field = if is_reasoning_model {
                "max_completion_tokens"
            } else {
                "max_tokens"
            };
            obj.insert(token_field.to_string(), json!(max_tokens));
        }
        if options.has_tools() {
            obj.insert("tools".to_string(), serde_json::to_value(&options.tools)?);
            if let Some(tool_choice) = &options.tool_choice {
                obj.insert("tool_choice".to_string(), tool_choice.to_openai());
            }
        }

        Ok(Value::Object(obj))
    }

    /// Messages already serialize in the Chat Completions shape. Content is
    /// sent as flat text, a tools-only assistant turn needs an explicit
    /// null content and no empty `tool_calls` array, and the front-end
    /// message id stays local.
    fn convert_message(message: Message) -> Result<Value> {
        let content = match &message {
            Message::AI { content: None, .. } => Value::Null,
            other => Value::String(other.text()),
        };

        let mut value = serde_json::to_value(message)?;
        if let Some(obj) = value.as_object_mut() {
            obj.insert("content".to_string(), content);
            obj.remove("id");
            if obj.get("tool_calls").and_then(Value::as_array).is_some_and(|calls| calls.is_empty()) {
                obj.remove("tool_calls");
            }
        }
        Ok(value)
    }

    async fn post(&self, path: &str, payload: &Value) -> Result<reqwest::Response> {
        let response = self
            .http_client
            .post(format!("{}{}", self.base_url, path))
            .json(payload)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("OpenAI API error ({}): {}", status, error_text);
        }

        Ok(response)
    }
}

#[async_trait]
impl ChatClient for OpenAIClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let payload = Self::build_chat_request(
            &request.model,
            request.messages,
            &request.options,
            false,
        )?;

        tracing::debug!(model = %request.model, "openai chat request");
        let response = self.post("/chat/completions", &payload).await?;

        let raw: Value = response.json().await.context("Failed to read chat response")?;
        let parsed: CompletionBody =
            serde_json::from_value(raw.clone()).context("Unexpected chat response shape")?;

        if let Some(usage) = &parsed.usage {
            tracing::debug!(
                model = %request.model,
                input_tokens = usage.prompt_tokens,
                output_tokens = usage.completion_tokens,
                "openai usage"
            );
        }

        let choice = parsed.choices.into_iter().next();
        let (message, finish_reason) = match choice {
            Some(choice) => (choice.message, choice.finish_reason),
            None => (CompletionMessage::default(), None),
        };

        Ok(ChatResponse {
            content: message.content,
            tool_calls: message.tool_calls,
            usage: parsed.usage.map(TokenUsage::from),
            finish_reason,
            raw,
        })
    }

    async fn chat_stream(&self, request: ChatRequest) -> Result<ChatStream> {
        let payload = Self::build_chat_request(
            &request.model,
            request.messages,
            &request.options,
            true,
        )?;

        tracing::debug!(model = %request.model, "openai chat stream request");
        let response = self.post("/chat/completions", &payload).await?;

        Ok(decode_sse_response(response, OpenAIChatParser))
    }
}

#[async_trait]
impl EmbeddingClient for OpenAIClient {
    async fn embed(&self, model: &str, inputs: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let payload = json!({ "model": model, "input": inputs });
        let response = self.post("/embeddings", &payload).await?;

        let mut raw: EmbeddingResponse = response
            .json()
            .await
            .context("Failed to parse embedding response")?;

        raw.data.sort_by_key(|d| d.index);
        Ok(raw.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[derive(Debug, Deserialize)]
struct CompletionBody {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
    usage: Option<CompletionUsage>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    #[serde(default)]
    message: CompletionMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Deserialize)]
struct CompletionUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

impl From<CompletionUsage> for TokenUsage {
    fn from(usage: CompletionUsage) -> Self {
        Self {
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        }
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Tool;

    #[test]
    fn test_tools_only_turn_has_null_content() {
        let call = ToolCall::new("call_1", "Search", &json!({ "query": "acme" }));
        let payload = OpenAIClient::build_chat_request(
            "gpt-4o",
            vec![
                Message::human("go").with_id("msg-a"),
                Message::ai_with_tools(vec![call]).with_id("run-r1-1"),
                Message::tool_result("call_1", "[]"),
            ],
            &ChatOptions::new(),
            false,
        )
        .unwrap();

        let messages = payload["messages"].as_array().unwrap();
        assert_eq!(messages[0], json!({ "role": "user", "content": "go" }));
        assert_eq!(messages[1]["content"], Value::Null);
        assert!(messages[1].get("id").is_none());
        assert_eq!(messages[1]["tool_calls"][0]["function"]["name"], "Search");
        assert_eq!(messages[2]["tool_call_id"], "call_1");
        assert!(payload.get("tools").is_none());
    }

    #[test]
    fn test_reasoning_models_use_completion_token_field() {
        let options = ChatOptions::sampling(Some(0.2), Some(500))
            .tools(vec![Tool::new("Search", "web search", json!({ "type": "object" }))]);
        let payload = OpenAIClient::build_chat_request("o1-mini", vec![Message::human("x")], &options, true).unwrap();

        assert!(payload.get("temperature").is_none());
        assert_eq!(payload["max_completion_tokens"], 500);
        assert_eq!(payload["tools"][0]["type"], "function");
    }
}
