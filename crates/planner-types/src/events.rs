use serde::{Deserialize, Serialize};
use std::fmt;

use crate::state::PlannerState;

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Reached END normally
    Success,
    /// Stopped on a question for the user
    Interrupted,
    /// Failed, timed out or hit the iteration limit
    Error,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Interrupted => "interrupted",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Id of the assistant turn produced by the `turn`-th agent call of a run
/// (counting from 1). Streamed partials and the stored message share it.
pub fn agent_message_id(run_id: &str, turn: u32) -> String {
    format!("run-{}-{}", run_id, turn)
}

/// Everything a planner run reports while it executes.
///
/// A run always opens with `InitStream` and closes with `EndStream`. In
/// between, node boundaries bracket model deltas (`Message`, `ToolCall`),
/// tool outcomes and a `Values` snapshot after every node.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    InitStream {
        run_id: String,
        conversation_id: String,
        timestamp: i64,
    },

    NodeStarted {
        node: String,
    },

    NodeCompleted {
        node: String,
    },

    /// Assistant text delta
    Message {
        content: String,
    },

    /// Tool call fragment; fragments sharing an `index` form one call
    ToolCall {
        index: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        arguments: Option<String>,
    },

    ToolResult {
        tool_call_id: String,
        tool_name: String,
        result: String,
        is_error: bool,
        duration_ms: u64,
    },

    /// The model asked the user a question; the run stops here
    AwaitingInput {
        question: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        context: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        options: Vec<String>,
    },

    /// A proposed plan went through review
    PlanReviewed {
        is_satisfactory: bool,
        revision: u32,
        feedback: String,
    },

    Values {
        state: Box<PlannerState>,
    },

    /// One model response finished streaming
    Done {
        #[serde(skip_serializing_if = "Option::is_none")]
        finish_reason: Option<String>,
    },

    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        node_id: Option<String>,
    },

    EndStream {
        status: RunStatus,
        total_duration_ms: u64,
    },
}

impl From<planner_llm::StreamEvent> for StreamEvent {
    fn from(event: planner_llm::StreamEvent) -> Self {
        match event {
            planner_llm::StreamEvent::Message { content } => Self::Message { content },
            planner_llm::StreamEvent::ToolCall { index, id, name, arguments } => Self::ToolCall {
                index,
                id,
                name,
                arguments,
            },
            planner_llm::StreamEvent::Done { finish_reason } => Self::Done { finish_reason },
        }
    }
}

impl StreamEvent {
    /// Events a client renders as part of the streamed AI message
    pub fn is_llm_delta(&self) -> bool {
        matches!(self, Self::Message { .. } | Self::ToolCall { .. })
    }

    /// Final status, if this event closes the run
    pub fn end_status(&self) -> Option<RunStatus> {
        match self {
            Self::EndStream { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_stream_wire_format() {
        let event = StreamEvent::EndStream {
            status: RunStatus::Interrupted,
            total_duration_ms: 12,
        };
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "end_stream");
        assert_eq!(json["status"], "interrupted");
        assert_eq!(event.end_status(), Some(RunStatus::Interrupted));
        assert_eq!(StreamEvent::NodeStarted { node: "agent".into() }.end_status(), None);
    }
}
