use anyhow::Result;
use async_trait::async_trait;
use planner_types::{PlannerState, StreamEvent};
use std::fmt;
use tokio::sync::mpsc;

pub type EventSender = mpsc::Sender<StreamEvent>;

/// A unit of work in the planner graph
#[async_trait]
pub trait Node: Send + Sync {
    /// Execute the node's logic, modifying state and emitting events
    async fn execute(&self, state: &mut PlannerState, event_tx: EventSender) -> Result<()>;

    fn node_type(&self) -> NodeType;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Agent,
    Tools,
    Reflect,
    ProcessUserInput,
}

impl NodeType {
    /// Name used in events and checkpoints
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Agent => "agent",
            Self::Tools => "tools",
            Self::Reflect => "reflect",
            Self::ProcessUserInput => "process_user_input",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
