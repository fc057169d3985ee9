use crate::checkpoint::{Checkpointer, PersistenceContext};
use crate::node::{EventSender, Node, NodeType};
use crate::nodes::{AgentNode, ReflectNode, ToolNode, UserInputNode};
use crate::router::{entry_node, PlannerRouter, Router};
use anyhow::{anyhow, Context, Result};
use planner_llm::ChatClient;
use planner_tools::ToolExecutor;
use planner_types::{GraphConfig, PlannerInput, PlannerState, RunStatus, StreamEvent};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

#[derive(Clone)]
pub struct Graph {
    llm_client: Arc<dyn ChatClient>,
    tool_executor: Arc<ToolExecutor>,
    config: GraphConfig,
    checkpointer: Option<Checkpointer>,
}

/// Nodes for one run
struct Nodes {
    agent: AgentNode,
    tools: ToolNode,
    reflect: ReflectNode,
    user_input: UserInputNode,
}

impl Nodes {
    fn get(&self, node_type: NodeType) -> &dyn Node {
        match node_type {
            NodeType::Agent => &self.agent,
            NodeType::Tools => &self.tools,
            NodeType::Reflect => &self.reflect,
            NodeType::ProcessUserInput => &self.user_input,
        }
    }
}

impl Graph {
    pub fn new(llm_client: Arc<dyn ChatClient>, tool_executor: Arc<ToolExecutor>, config: GraphConfig) -> Self {
        Self::from_parts(llm_client, tool_executor, config, None)
    }

    pub(crate) fn from_parts(
        llm_client: Arc<dyn ChatClient>,
        tool_executor: Arc<ToolExecutor>,
        config: GraphConfig,
        checkpointer: Option<Checkpointer>,
    ) -> Self {
        Self {
            llm_client,
            tool_executor,
            config,
            checkpointer,
        }
    }

    /// Create a builder for fluent construction
    pub fn builder() -> crate::builder::GraphBuilder {
        crate::builder::GraphBuilder::new()
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Spawn execution in background, return event receiver
    pub fn spawn_run(
        &self,
        input: PlannerInput,
        persistence_ctx: Option<PersistenceContext>,
    ) -> mpsc::Receiver<StreamEvent> {
        let (tx, rx) = mpsc::channel(1000);
        let graph = self.clone();

        tokio::spawn(async move {
            let _ = graph.run_with_events(input, tx, persistence_ctx).await;
        });

        rx
    }

    /// Run to completion and return the final state. Events are logged and dropped.
    pub async fn run(
        &self,
        input: PlannerInput,
        persistence_ctx: Option<PersistenceContext>,
    ) -> Result<PlannerState> {
        Ok(self.run_with_status(input, persistence_ctx).await?.0)
    }

    /// Like [`Graph::run`], also returning how the run ended. A run that
    /// hits the iteration limit still yields its state, with
    /// [`RunStatus::Error`].
    pub async fn run_with_status(
        &self,
        input: PlannerInput,
        persistence_ctx: Option<PersistenceContext>,
    ) -> Result<(PlannerState, RunStatus)> {
        let (tx, mut rx) = mpsc::channel(1000);

        let drain = tokio::spawn(async move {
            let mut status = RunStatus::Error;
            while let Some(event) = rx.recv().await {
                if let StreamEvent::Error { message, .. } = &event {
                    tracing::warn!(error = %message, "run reported an error");
                }
                if let Some(end) = event.end_status() {
                    status = end;
                }
            }
            status
        });

        let result = self.run_with_events(input, tx, persistence_ctx).await;
        let status = drain.await.unwrap_or(RunStatus::Error);
        Ok((result?, status))
    }

    /// Execute with a timeout; failures are reported as Error + EndStream{error}
    async fn run_with_events(
        &self,
        input: PlannerInput,
        event_tx: EventSender,
        ctx: Option<PersistenceContext>,
    ) -> Result<PlannerState> {
        let start_time = Instant::now();
        let timeout = self.config.execution_timeout;

        let result = match tokio::time::timeout(timeout, self.execute_loop(input, event_tx.clone(), ctx)).await {
            Ok(result) => result,
            Err(_) => Err(anyhow!("Run timed out after {}s", timeout.as_secs())),
        };

        if let Err(e) = &result {
            tracing::error!(error = %format!("{:#}", e), "graph run failed");
            let _ = event_tx
                .send(StreamEvent::Error {
                    message: format!("{:#}", e),
                    node_id: None,
                })
                .await;
            let _ = event_tx
                .send(StreamEvent::EndStream {
                    status: RunStatus::Error,
                    total_duration_ms: start_time.elapsed().as_millis() as u64,
                })
                .await;
        }

        result
    }

    async fn execute_loop(
        &self,
        input: PlannerInput,
        event_tx: EventSender,
        ctx: Option<PersistenceContext>,
    ) -> Result<PlannerState> {
        let start_time = Instant::now();

        let mut state = PlannerState::from_input(input);

        event_tx
            .send(StreamEvent::InitStream {
                run_id: state.run_id.clone(),
                conversation_id: state.conversation_id.clone(),
                timestamp: chrono::Utc::now().timestamp_millis(),
            })
            .await?;

        let nodes = Nodes {
            agent: AgentNode::new(Arc::clone(&self.llm_client), Arc::clone(&self.tool_executor)),
            tools: ToolNode::new(Arc::clone(&self.tool_executor)),
            reflect: ReflectNode::new(Arc::clone(&self.llm_client)),
            user_input: UserInputNode::new(),
        };
        let router = PlannerRouter;

        let mut current_node = entry_node(&state);
        let mut iteration = 0;
        let mut status = RunStatus::Success;

        loop {
            // Guardrail: max iterations
            if iteration >= self.config.max_iterations {
                tracing::warn!(max = self.config.max_iterations, "iteration limit reached");
                event_tx
                    .send(StreamEvent::Error {
                        message: format!("Max iterations ({}) reached", self.config.max_iterations),
                        node_id: None,
                    })
                    .await?;
                status = RunStatus::Error;
                break;
            }

            event_tx
                .send(StreamEvent::NodeStarted {
                    node: current_node.to_string(),
                })
                .await?;

            let node_start = Instant::now();
            nodes
                .get(current_node)
                .execute(&mut state, event_tx.clone())
                .await
                .with_context(|| format!("{} node failed", current_node))?;

            tracing::debug!(
                node = %current_node,
                duration_ms = node_start.elapsed().as_millis() as u64,
                "node completed"
            );

            self.handle_post_node_execution(&state, current_node, &event_tx, &ctx)
                .await?;

            match router.next(&state, current_node).node() {
                Some(next) => current_node = next,
                None => break,
            }

            iteration += 1;
        }

        if status == RunStatus::Success && state.awaiting_user_input {
            status = RunStatus::Interrupted;
        }

        event_tx
            .send(StreamEvent::EndStream {
                status,
                total_duration_ms: start_time.elapsed().as_millis() as u64,
            })
            .await?;

        Ok(state)
    }

    /// Checkpoint the state and publish it
    async fn handle_post_node_execution(
        &self,
        state: &PlannerState,
        node_type: NodeType,
        event_tx: &EventSender,
        ctx: &Option<PersistenceContext>,
    ) -> Result<()> {
        if let (Some(checkpointer), Some(context)) = (&self.checkpointer, ctx) {
            checkpointer.save(context, node_type, state).await;
        }

        event_tx
            .send(StreamEvent::NodeCompleted {
                node: node_type.to_string(),
            })
            .await?;
        event_tx
            .send(StreamEvent::Values {
                state: Box::new(state.clone()),
            })
            .await?;

        Ok(())
    }
}
