//! Translation of graph events into the server-sent events a LangGraph
//! client consumes.

use axum::response::sse::Event;
use planner_llm::ResponseAccumulator;
use planner_types::{agent_message_id, StreamEvent};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::wire;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamMode {
    /// Full state after every node
    Values,
    /// The AI message being streamed, as a growing snapshot (`messages/partial`)
    Messages,
    /// Token chunks paired with node metadata (`messages`)
    MessagesTuple,
    /// Per-node state, keyed by node name
    Updates,
}

impl StreamMode {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "values" => Some(Self::Values),
            "messages" => Some(Self::Messages),
            "messages-tuple" => Some(Self::MessagesTuple),
            "updates" => Some(Self::Updates),
            _ => None,
        }
    }

    /// Modes requested as a string or a list; unknown names are skipped
    pub fn from_request(value: Option<&Value>) -> Vec<Self> {
        let names: Vec<&str> = match value {
            Some(Value::String(name)) => vec![name.as_str()],
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            _ => return vec![Self::Values, Self::Messages],
        };

        let modes: Vec<Self> = names
            .into_iter()
            .filter_map(|name| {
                let mode = Self::parse(name);
                if mode.is_none() {
                    tracing::debug!(mode = name, "ignoring unsupported stream mode");
                }
                mode
            })
            .collect();

        if modes.is_empty() {
            vec![Self::Values]
        } else {
            modes
        }
    }
}

/// Stateful mapper for one run's event stream
pub struct RunEventMapper {
    modes: Vec<StreamMode>,
    run_id: String,
    node: Option<String>,
    accumulator: ResponseAccumulator,
    /// Agent calls started so far in this run
    turn: u32,
}

impl RunEventMapper {
    pub fn new(modes: Vec<StreamMode>) -> Self {
        Self {
            modes,
            run_id: String::new(),
            node: None,
            accumulator: ResponseAccumulator::new(),
            turn: 0,
        }
    }

    fn wants(&self, mode: StreamMode) -> bool {
        self.modes.contains(&mode)
    }

    /// Matches the id the agent stores on the finished message
    fn message_id(&self) -> String {
        agent_message_id(&self.run_id, self.turn)
    }

    pub fn map(&mut self, event: StreamEvent) -> Vec<Event> {
        match event {
            StreamEvent::InitStream { run_id, .. } => {
                self.run_id = run_id;
                vec![sse_event("metadata", json!({ "run_id": self.run_id, "attempt": 1 }))]
            }
            StreamEvent::NodeStarted { node } => {
                if node == "agent" {
                    self.turn += 1;
                }
                self.node = Some(node);
                self.accumulator = ResponseAccumulator::new();
                Vec::new()
            }
            StreamEvent::Message { .. } | StreamEvent::ToolCall { .. } => self.map_delta(event),
            StreamEvent::Values { state } => {
                let values = wire::state_values(&state);
                let mut events = Vec::new();
                if self.wants(StreamMode::Updates) {
                    let node = self.node.clone().unwrap_or_default();
                    events.push(sse_event("updates", json!({ node: values.clone() })));
                }
                if self.wants(StreamMode::Values) {
                    events.push(sse_event("values", values));
                }
                events
            }
            StreamEvent::Error { message, node_id } => vec![sse_event(
                "error",
                json!({ "error": "GraphError", "message": message, "node": node_id }),
            )],
            StreamEvent::EndStream { status, .. } => {
                tracing::debug!(run_id = %self.run_id, status = %status, "run stream finished");
                vec![sse_event("end", Value::Null)]
            }
            StreamEvent::NodeCompleted { .. }
            | StreamEvent::ToolResult { .. }
            | StreamEvent::AwaitingInput { .. }
            | StreamEvent::PlanReviewed { .. }
            | StreamEvent::Done { .. } => Vec::new(),
        }
    }

    fn map_delta(&mut self, event: StreamEvent) -> Vec<Event> {
        let mut events = Vec::new();

        if self.wants(StreamMode::MessagesTuple) {
            let chunk = match &event {
                StreamEvent::Message { content } => json!({
                    "type": "AIMessageChunk",
                    "id": self.message_id(),
                    "content": content,
                    "tool_call_chunks": [],
                }),
                StreamEvent::ToolCall { index, id, name, arguments } => json!({
                    "type": "AIMessageChunk",
                    "id": self.message_id(),
                    "content": "",
                    "tool_call_chunks": [{
                        "index": index,
                        "id": id,
                        "name": name,
                        "args": arguments.clone().unwrap_or_default(),
                    }],
                }),
                _ => Value::Null,
            };
            let metadata = json!({ "langgraph_node": self.node, "run_id": self.run_id });
            events.push(sse_event("messages", json!([chunk, metadata])));
        }

        if let Some(delta) = to_llm_event(event) {
            self.accumulator.push(&delta);
        }

        if self.wants(StreamMode::Messages) {
            let snapshot = self.accumulator.to_message();
            let message = wire::to_wire(&snapshot, &self.message_id(), &HashMap::new());
            events.push(sse_event("messages/partial", json!([message])));
        }

        events
    }
}

fn to_llm_event(event: StreamEvent) -> Option<planner_llm::StreamEvent> {
    match event {
        StreamEvent::Message { content } => Some(planner_llm::StreamEvent::Message { content }),
        StreamEvent::ToolCall { index, id, name, arguments } => {
            Some(planner_llm::StreamEvent::ToolCall { index, id, name, arguments })
        }
        _ => None,
    }
}

pub fn sse_event(name: &str, data: Value) -> Event {
    Event::default()
        .event(name)
        .json_data(&data)
        .unwrap_or_else(|e| {
            tracing::warn!(event = name, error = %e, "failed to encode SSE payload");
            Event::default().event(name).data("null")
        })
}
