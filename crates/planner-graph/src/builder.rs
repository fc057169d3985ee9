use std::sync::Arc;

use anyhow::{bail, Result};
use planner_llm::ChatClient;
use planner_persist::PersistenceClient;
use planner_tools::ToolExecutor;
use planner_types::GraphConfig;

use crate::checkpoint::Checkpointer;
use crate::graph::Graph;

/// Fluent construction of a [`Graph`].
///
/// The chat client and tool executor are required. Without persistence the
/// graph still runs but nothing is checkpointed.
#[derive(Default)]
pub struct GraphBuilder {
    llm_client: Option<Arc<dyn ChatClient>>,
    tool_executor: Option<Arc<ToolExecutor>>,
    config: GraphConfig,
    checkpointer: Option<Checkpointer>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Client shared by the agent and the plan reviewer
    pub fn llm_client(mut self, client: Arc<dyn ChatClient>) -> Self {
        self.llm_client = Some(client);
        self
    }

    pub fn tool_executor(mut self, executor: Arc<ToolExecutor>) -> Self {
        self.tool_executor = Some(executor);
        self
    }

    pub fn config(mut self, config: GraphConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_persistence(mut self, client: Arc<dyn PersistenceClient>) -> Self {
        self.checkpointer = Some(Checkpointer::new(client));
        self
    }

    pub fn build(self) -> Result<Graph> {
        let Some(llm_client) = self.llm_client else {
            bail!("GraphBuilder: an LLM client is required");
        };
        let Some(tool_executor) = self.tool_executor else {
            bail!("GraphBuilder: a tool executor is required");
        };
        if self.config.max_iterations == 0 {
            bail!("GraphBuilder: max_iterations must be at least 1");
        }

        Ok(Graph::from_parts(llm_client, tool_executor, self.config, self.checkpointer))
    }
}
