// Anthropic Messages API client

use super::stream::{normalize_stop_reason, AnthropicStreamParser};
use crate::sse::decode_sse_response;
use crate::streaming::ChatStream;
use crate::traits::{ChatClient, ChatOptions, ChatRequest, ChatResponse, TokenUsage};
use crate::types::{Message, ToolCall, ToolChoice};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Anthropic client (HTTP direct, no SDK)
pub struct AnthropicClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl AnthropicClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(&api_key).context("Invalid API key format")?,
        );
        headers.insert("anthropic-version", HeaderValue::from_static(ANTHROPIC_VERSION));

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            base_url: ANTHROPIC_API_BASE.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Build a Messages API payload.
    ///
    /// System messages are lifted into the top-level `system` field, tool
    /// results become `tool_result` blocks on a user turn, and consecutive
    /// turns with the same role are merged since the API requires strict
    /// user/assistant alternation.
    pub(crate) fn build_request(
        model: &str,
        messages: Vec<Message>,
        options: &ChatOptions,
        stream: bool,
    ) -> Result<Value> {
        let mut system_parts: Vec<String> = Vec::new();
        let mut turns: Vec<(&'static str, Vec<Value>)> = Vec::new();

        for message in messages {
            let (role, blocks) = match message {
                Message::System { content, .. } => {
                    system_parts.push(content.to_text());
                    continue;
                }
                Message::Human { content, .. } => {
                    ("user", vec![json!({ "type": "text", "text": content.to_text() })])
                }
                Message::AI { content, tool_calls, .. } => {
                    let mut blocks = Vec::new();
                    if let Some(content) = content.filter(|c| !c.is_empty()) {
                        blocks.push(json!({ "type": "text", "text": content.to_text() }));
                    }
                    for call in tool_calls.unwrap_or_default() {
                        let input = call.arguments_value().with_context(|| {
                            format!("Invalid arguments for tool call {}", call.id)
                        })?;
                        blocks.push(json!({
                            "type": "tool_use",
                            "id": call.id,
                            "name": call.name,
                            "input": input,
                        }));
                    }
                    if blocks.is_empty() {
                        continue;
                    }
                    ("assistant", blocks)
                }
                Message::Tool { tool_call_id, content, .. } => (
                    "user",
                    vec![json!({
                        "type": "tool_result",
                        "tool_use_id": tool_call_id,
                        "content": content.to_text(),
                    })],
                ),
            };

            match turns.last_mut() {
                Some((last_role, last_blocks)) if *last_role == role => {
                    last_blocks.extend(blocks)
                }
                _ => turns.push((role, blocks)),
            }
        }

        let messages: Vec<Value> = turns
            .into_iter()
            .map(|(role, content)| json!({ "role": role, "content": content }))
            .collect();

        let mut obj = Map::new();
        obj.insert("model".to_string(), json!(model));
        obj.insert("messages".to_string(), json!(messages));
        obj.insert(
            "max_tokens".to_string(),
            json!(options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)),
        );
        if stream {
            obj.insert("stream".to_string(), json!(true));
        }
        if !system_parts.is_empty() {
            obj.insert("system".to_string(), json!(system_parts.join("\n\n")));
        }
        if let Some(temp) = options.temperature {
            obj.insert("temperature".to_string(), json!(temp));
        }

        let tool_choice = options.tool_choice.as_ref().map(convert_tool_choice);
        let tools_disabled = matches!(tool_choice, Some(None));

        if options.has_tools() && !tools_disabled {
            let tools: Vec<Value> = options
                .tools
                .iter()
                .flatten()
                .map(|tool| {
                    json!({
                        "name": tool.name,
                        "description": tool.description,
                        "input_schema": tool.parameters,
                    })
                })
                .collect();
            obj.insert("tools".to_string(), json!(tools));

            if let Some(Some(choice)) = tool_choice {
                obj.insert("tool_choice".to_string(), choice);
            }
        }

        Ok(Value::Object(obj))
    }

    async fn post(&self, payload: &Value) -> Result<reqwest::Response> {
        let response = self
            .http_client
            .post(format!("{}/messages", self.base_url))
            .json(payload)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Anthropic API error ({}): {}", status, error_text);
        }

        Ok(response)
    }
}

/// `None` means tools must not be sent at all
fn convert_tool_choice(choice: &ToolChoice) -> Option<Value> {
    match choice {
        ToolChoice::None => None,
        ToolChoice::Auto => Some(json!({ "type": "auto" })),
        ToolChoice::Required => Some(json!({ "type": "any" })),
        ToolChoice::Tool(name) => Some(json!({ "type": "tool", "name": name })),
    }
}

#[async_trait]
impl ChatClient for AnthropicClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let payload = Self::build_request(&request.model, request.messages, &request.options, false)?;

        tracing::debug!(model = %request.model, "anthropic chat request");
        let response = self.post(&payload).await?;

        let raw: AnthropicResponse = response
            .json()
            .await
            .context("Failed to parse response")?;

        let mut text = String::new();
        let mut tool_calls = Vec::new();
        for block in &raw.content {
            match block {
                ResponseBlock::Text { text: t } => text.push_str(t),
                ResponseBlock::ToolUse { id, name, input } => {
                    tool_calls.push(ToolCall::new(id.clone(), name.clone(), input))
                }
                ResponseBlock::Other => {}
            }
        }

        Ok(ChatResponse {
            content: if text.is_empty() { None } else { Some(text) },
            tool_calls: if tool_calls.is_empty() { None } else { Some(tool_calls) },
            usage: raw.usage.as_ref().map(|u| TokenUsage {
                input_tokens: u.input_tokens,
                output_tokens: u.output_tokens,
                total_tokens: u.input_tokens + u.output_tokens,
            }),
            finish_reason: raw.stop_reason.as_deref().map(normalize_stop_reason),
            raw: serde_json::to_value(&raw)?,
        })
    }

    async fn chat_stream(&self, request: ChatRequest) -> Result<ChatStream> {
        let payload = Self::build_request(&request.model, request.messages, &request.options, true)?;

        tracing::debug!(model = %request.model, "anthropic chat stream request");
        let response = self.post(&payload).await?;

        Ok(decode_sse_response(response, AnthropicStreamParser))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    id: String,
    content: Vec<ResponseBlock>,
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Serialize, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}
