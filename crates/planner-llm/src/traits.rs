use crate::streaming::ChatStream;
use crate::types::{Message, Tool, ToolCall, ToolChoice};
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A chat-completions backend that can call tools.
///
/// Implemented by each provider client and by [`crate::ProviderRegistry`],
/// which routes on the `provider/model` prefix of the request's model.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse>;

    /// Same request, answered as incremental [`crate::StreamEvent`]s
    async fn chat_stream(&self, request: ChatRequest) -> Result<ChatStream>;
}

/// Text embeddings for the semantic memory store
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// One vector per input, in input order
    async fn embed(&self, model: &str, inputs: Vec<String>) -> Result<Vec<Vec<f32>>>;
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub options: ChatOptions,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            options: ChatOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ChatOptions) -> Self {
        self.options = options;
        self
    }
}

/// Per-request knobs; unset fields fall back to the provider default
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub tools: Option<Vec<Tool>>,
    pub tool_choice: Option<ToolChoice>,
}

impl ChatOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options carrying only sampling settings, typically from a run's config
    pub fn sampling(temperature: Option<f32>, max_tokens: Option<u32>) -> Self {
        Self {
            temperature,
            max_tokens,
            ..Self::default()
        }
    }

    pub fn temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    pub fn max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }

    pub fn tools(mut self, tools: Vec<Tool>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn tool_choice(mut self, choice: ToolChoice) -> Self {
        self.tool_choice = Some(choice);
        self
    }

    /// Tools are sent only when at least one is bound
    pub fn has_tools(&self) -> bool {
        self.tools.as_ref().is_some_and(|tools| !tools.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: Option<String>,
    pub tool_calls: Option<Vec<ToolCall>>,
    pub usage: Option<TokenUsage>,
    pub finish_reason: Option<String>,
    pub raw: serde_json::Value,
}

impl ChatResponse {
    /// Convert into the assistant message that should be appended to history
    pub fn into_message(self) -> Message {
        Message::AI {
            content: self.content.filter(|c| !c.is_empty()).map(Into::into),
            tool_calls: self.tool_calls.filter(|calls| !calls.is_empty()),
            name: None,
            id: None,
        }
    }

    /// First tool call with the given name
    pub fn tool_call(&self, name: &str) -> Option<&ToolCall> {
        self.tool_calls
            .as_ref()
            .and_then(|calls| calls.iter().find(|c| c.name == name))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
}
