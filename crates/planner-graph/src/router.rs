use crate::node::NodeType;
use crate::tools::{ASK_USER_INPUT, MARKETING_PLAN};
use planner_tools::names;
use planner_types::PlannerState;

/// Messages inspected when counting recent memory tool calls
pub const MEMORY_WINDOW: usize = 5;

/// Memory calls within the window at which memory tools are switched off
pub const MEMORY_CALL_LIMIT: usize = 3;

/// Decides which node to execute next based on current state
pub trait Router: Send + Sync {
    fn next(&self, state: &PlannerState, current: NodeType) -> NextNode;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextNode {
    Agent,
    Tools,
    Reflect,
    ProcessUserInput,
    End,
}

impl NextNode {
    pub fn node(self) -> Option<NodeType> {
        match self {
            Self::Agent => Some(NodeType::Agent),
            Self::Tools => Some(NodeType::Tools),
            Self::Reflect => Some(NodeType::Reflect),
            Self::ProcessUserInput => Some(NodeType::ProcessUserInput),
            Self::End => None,
        }
    }
}

/// Research loop routing:
/// agent -> tools -> agent ... -> reflect -> (agent | END), with AskUserInput
/// interrupting the run until the user replies.
pub struct PlannerRouter;

impl Router for PlannerRouter {
    fn next(&self, state: &PlannerState, current: NodeType) -> NextNode {
        match current {
            NodeType::Agent => route_after_agent(state),
            NodeType::Reflect => route_after_checker(state),
            NodeType::Tools | NodeType::ProcessUserInput => NextNode::Agent,
        }
    }
}

/// First node of a run: a thread waiting on the user resumes by processing the reply
pub fn entry_node(state: &PlannerState) -> NodeType {
    if state.awaiting_user_input {
        NodeType::ProcessUserInput
    } else {
        NodeType::Agent
    }
}

/// True once the model has leaned on memory tools too often in a row
pub fn memory_tools_exhausted(state: &PlannerState) -> bool {
    state.recent_tool_call_count(MEMORY_WINDOW, &names::MEMORY_TOOLS) >= MEMORY_CALL_LIMIT
}

pub fn route_after_agent(state: &PlannerState) -> NextNode {
    let calls = match state.last_message() {
        Some(message) if message.is_ai() => message.tool_calls(),
        _ => {
            return if state.awaiting_user_input {
                NextNode::ProcessUserInput
            } else {
                NextNode::Agent
            };
        }
    };

    let Some(first) = calls.first() else {
        return NextNode::End;
    };

    if names::is_memory_tool(first.name()) && memory_tools_exhausted(state) {
        tracing::warn!("memory tool loop detected, returning to agent");
        return NextNode::Agent;
    }

    match first.name() {
        MARKETING_PLAN => NextNode::Reflect,
        ASK_USER_INPUT => NextNode::End,
        _ => NextNode::Tools,
    }
}

pub fn route_after_checker(state: &PlannerState) -> NextNode {
    if state.loop_step >= state.config.max_loops {
        return NextNode::End;
    }

    if state.marketing_plan.is_none() {
        return NextNode::Agent;
    }

    match &state.last_review {
        Some(review) if review.is_satisfactory => NextNode::End,
        _ => NextNode::Agent,
    }
}
