use anyhow::Result;
use serde::Deserialize;

use crate::sse::SseDecoder;
use crate::streaming::StreamEvent;

/// Server-sent events of the Messages API, tagged by their `type` field
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicEvent {
    ContentBlockStart {
        index: u32,
        content_block: ContentBlock,
    },
    ContentBlockDelta {
        index: u32,
        delta: BlockDelta,
    },
    MessageDelta {
        delta: MessageDelta,
    },
    Error {
        error: ApiErrorBody,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        #[serde(default)]
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum BlockDelta {
    TextDelta { text: String },
    InputJsonDelta { partial_json: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct MessageDelta {
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(rename = "type")]
    error_type: String,
    message: String,
}

/// Map Anthropic stop reasons onto the OpenAI vocabulary used everywhere else
pub(crate) fn normalize_stop_reason(reason: &str) -> String {
    match reason {
        "tool_use" => "tool_calls",
        "end_turn" | "stop_sequence" => "stop",
        "max_tokens" => "length",
        other => other,
    }
    .to_string()
}

/// Messages API stream parser
pub struct AnthropicStreamParser;

impl SseDecoder for AnthropicStreamParser {
    fn decode(&self, data: &str) -> Result<Vec<StreamEvent>> {
        let event: AnthropicEvent = serde_json::from_str(data)
            .map_err(|e| anyhow::anyhow!("Failed to parse Anthropic event: {}", e))?;

        let events = match event {
            AnthropicEvent::ContentBlockStart { index, content_block } => match content_block {
                ContentBlock::ToolUse { id, name } => vec![StreamEvent::ToolCall {
                    index,
                    id: Some(id),
                    name: Some(name),
                    arguments: None,
                }],
                ContentBlock::Text { text } if !text.is_empty() => {
                    vec![StreamEvent::Message { content: text }]
                }
                _ => Vec::new(),
            },
            AnthropicEvent::ContentBlockDelta { index, delta } => match delta {
                BlockDelta::TextDelta { text } => vec![StreamEvent::Message { content: text }],
                BlockDelta::InputJsonDelta { partial_json } => vec![StreamEvent::ToolCall {
                    index,
                    id: None,
                    name: None,
                    arguments: Some(partial_json),
                }],
                BlockDelta::Other => Vec::new(),
            },
            AnthropicEvent::MessageDelta { delta } => match delta.stop_reason {
                Some(reason) => vec![StreamEvent::Done {
                    finish_reason: Some(normalize_stop_reason(&reason)),
                }],
                None => Vec::new(),
            },
            AnthropicEvent::Error { error } => {
                anyhow::bail!("Anthropic stream error ({}): {}", error.error_type, error.message)
            }
            AnthropicEvent::Other => Vec::new(),
        };

        Ok(events)
    }

    fn is_end(&self, _data: &str) -> bool {
        false
    }
}
