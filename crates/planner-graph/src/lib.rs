//! The marketing planner graph.
//!
//! An `agent` node researches with tools until it proposes a `MarketingPlan`,
//! which a `reflect` node reviews. The agent may stop the run to ask the user a
//! question; the next run resumes in `process_user_input`.

pub mod builder;
pub mod checkpoint;
pub mod graph;
pub mod node;
pub mod nodes;
pub mod prompts;
pub mod router;
pub mod tools;

pub use builder::GraphBuilder;
pub use checkpoint::{Checkpointer, PersistenceContext};
pub use graph::Graph;
pub use node::{EventSender, Node, NodeType};
pub use nodes::{AgentNode, ReflectNode, ToolNode, UserInputNode};
pub use router::{NextNode, PlannerRouter, Router};

pub use planner_types::{GraphConfig, PlannerInput, PlannerState, RunStatus, StreamEvent};
