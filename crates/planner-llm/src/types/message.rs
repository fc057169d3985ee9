use serde::{Deserialize, Serialize};
use super::content::Content;
use super::tool::ToolCall;

/// One turn of a planning conversation.
///
/// Serialized with an OpenAI-style `role` tag so persisted thread state and
/// provider payloads share a shape. Roles map to `system`, `user`,
/// `assistant` and `tool`. The optional `id` identifies the turn to chat
/// front-ends and is never sent to a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    System {
        content: Content,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },

    #[serde(rename = "user")]
    Human {
        content: Content,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },

    /// Model turn. Either field may be absent but a useful turn has one.
    #[serde(rename = "assistant")]
    AI {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<Content>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_calls: Option<Vec<ToolCall>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },

    /// Answer to the assistant call with id `tool_call_id`
    Tool {
        tool_call_id: String,
        content: Content,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },
}

impl Message {
    pub fn system(content: impl Into<Content>) -> Self {
        Self::System {
            content: content.into(),
            name: None,
            id: None,
        }
    }

    pub fn human(content: impl Into<Content>) -> Self {
        Self::Human {
            content: content.into(),
            name: None,
            id: None,
        }
    }

    pub fn ai(content: impl Into<Content>) -> Self {
        Self::AI {
            content: Some(content.into()),
            tool_calls: None,
            name: None,
            id: None,
        }
    }

    pub fn ai_with_tools(tool_calls: Vec<ToolCall>) -> Self {
        Self::AI {
            content: None,
            tool_calls: Some(tool_calls),
            name: None,
            id: None,
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<Content>) -> Self {
        Self::Tool {
            tool_call_id: tool_call_id.into(),
            content: content.into(),
            id: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.set_id(id);
        self
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        let slot = match self {
            Self::System { id, .. } | Self::Human { id, .. } | Self::AI { id, .. } | Self::Tool { id, .. } => id,
        };
        *slot = Some(id.into());
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            Self::System { id, .. } | Self::Human { id, .. } | Self::AI { id, .. } | Self::Tool { id, .. } => {
                id.as_deref()
            }
        }
    }

    /// Wire role name
    pub fn role(&self) -> &str {
        match self {
            Self::System { .. } => "system",
            Self::Human { .. } => "user",
            Self::AI { .. } => "assistant",
            Self::Tool { .. } => "tool",
        }
    }

    pub fn is_ai(&self) -> bool {
        matches!(self, Self::AI { .. })
    }

    pub fn is_human(&self) -> bool {
        matches!(self, Self::Human { .. })
    }

    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            Self::AI { tool_calls: Some(calls), .. } => calls,
            _ => &[],
        }
    }

    /// For tool results, the id of the call being answered
    pub fn answers(&self) -> Option<&str> {
        match self {
            Self::Tool { tool_call_id, .. } => Some(tool_call_id),
            _ => None,
        }
    }

    /// Readable text of the turn; empty for a tools-only assistant turn
    pub fn text(&self) -> String {
        match self {
            Self::System { content, .. } | Self::Human { content, .. } | Self::Tool { content, .. } => {
                content.to_text()
            }
            Self::AI { content, .. } => content.as_ref().map(Content::to_text).unwrap_or_default(),
        }
    }
}
