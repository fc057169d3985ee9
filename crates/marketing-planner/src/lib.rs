//! # Marketing Planner
//!
//! Give it a business website and a conversation; it researches the business,
//! asks the questions it needs answered and proposes a marketing media plan
//! that a second model pass has reviewed.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use marketing_planner::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let planner = PlannerBuilder::new()
//!         .anthropic_key(std::env::var("ANTHROPIC_API_KEY")?)
//!         .tavily_key(std::env::var("TAVILY_API_KEY")?)
//!         .build()?;
//!
//!     let thread_id = planner.start_thread().await?;
//!     match planner.chat_in_thread(&thread_id, "Plan for https://acme.com").await? {
//!         Outcome::Plan(plan) => println!("{}", plan.summary()),
//!         Outcome::Question { question, .. } => println!("Planner asks: {}", question),
//!         Outcome::Reply(text) => println!("{}", text),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **planner-types**: state, run config, stream events, plan schema
//! - **planner-graph**: agent / tools / reflect / process-user-input nodes and the router
//! - **planner-llm**: OpenAI and Anthropic chat clients with streaming
//! - **planner-tools**: web search, scraping, website analysis, semantic memory
//! - **planner-persist**: thread and checkpoint storage
//!
//! For the HTTP development server see the `planner-api` crate.

pub use planner_graph as graph;
pub use planner_llm as llm;
pub use planner_persist as persist;
pub use planner_tools as tools;
pub use planner_types as types;

pub use planner_graph::{Graph, Node};
pub use planner_llm::{ChatClient, Content, Message};
pub use planner_persist::{InMemoryPersistenceClient, PersistenceClient};
pub use planner_types::{GraphConfig, MarketingPlan, PlannerState, RunConfig, RunStatus, StreamEvent};

/// High-level builder for a ready-to-use planner
pub mod builder;

pub use builder::{Outcome, Planner, PlannerBuilder};

/// Convenient prelude with commonly used types
pub mod prelude {
    pub use crate::builder::{Outcome, Planner, PlannerBuilder};
    pub use crate::llm::{Content, Message};
    pub use crate::types::{GraphConfig, MarketingPlan, RunConfig, RunStatus, StreamEvent};
    pub use anyhow::Result;
}
