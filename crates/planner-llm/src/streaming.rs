use std::collections::BTreeMap;
use std::pin::Pin;

use anyhow::Result;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};

use crate::types::{Message, ToolCall};

/// Boxed stream of provider-agnostic streaming events
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Message {
        content: String,
    },

    ToolCall {
        index: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        arguments: Option<String>,
    },

    Done {
        #[serde(skip_serializing_if = "Option::is_none")]
        finish_reason: Option<String>,
    },
}

/// Folds streamed deltas back into a complete assistant turn.
///
/// Tool call fragments are keyed by their index; ids and names arrive once,
/// argument JSON arrives in pieces.
#[derive(Debug, Default)]
pub struct ResponseAccumulator {
    content: String,
    tool_calls: BTreeMap<u32, (Option<String>, Option<String>, String)>,
    finish_reason: Option<String>,
}

impl ResponseAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: &StreamEvent) {
        match event {
            StreamEvent::Message { content } => self.content.push_str(content),
            StreamEvent::ToolCall { index, id, name, arguments } => {
                let entry = self
                    .tool_calls
                    .entry(*index)
                    .or_insert((None, None, String::new()));
                if let Some(id) = id {
                    entry.0 = Some(id.clone());
                }
                if let Some(name) = name {
                    entry.1 = Some(name.clone());
                }
                if let Some(args) = arguments {
                    entry.2.push_str(args);
                }
            }
            StreamEvent::Done { finish_reason } => {
                if finish_reason.is_some() {
                    self.finish_reason = finish_reason.clone();
                }
            }
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn finish_reason(&self) -> Option<&str> {
        self.finish_reason.as_deref()
    }

    /// Completed tool calls, in index order. Fragments without id or name are dropped.
    pub fn tool_calls(&self) -> Vec<ToolCall> {
        self.tool_calls
            .values()
            .filter_map(|(id, name, arguments)| match (id, name) {
                (Some(id), Some(name)) => Some(ToolCall::from_raw(id, name, arguments)),
                _ => None,
            })
            .collect()
    }

    /// Assistant turn accumulated so far
    pub fn to_message(&self) -> Message {
        let tool_calls = self.tool_calls();
        Message::AI {
            content: if self.content.is_empty() {
                None
            } else {
                Some(self.content.clone().into())
            },
            tool_calls: if tool_calls.is_empty() {
                None
            } else {
                Some(tool_calls)
            },
            name: None,
            id: None,
        }
    }

    pub fn into_message(self) -> Message {
        self.to_message()
    }
}

/// Drain a stream into a single assistant message
pub async fn collect_message(mut stream: ChatStream) -> Result<Message> {
    let mut acc = ResponseAccumulator::new();
    while let Some(event) = stream.next().await {
        acc.push(&event?);
    }
    Ok(acc.into_message())
}
