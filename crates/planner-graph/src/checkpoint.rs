use std::sync::Arc;

use planner_persist::PersistenceClient;
use planner_types::PlannerState;

use crate::node::NodeType;

/// Thread a run checkpoints into
#[derive(Debug, Clone)]
pub struct PersistenceContext {
    pub thread_id: String,
}

impl PersistenceContext {
    pub fn new(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
        }
    }
}

/// Writes a checkpoint after every node.
///
/// A failed write is logged and the run carries on; the thread keeps its
/// previous checkpoint.
#[derive(Clone)]
pub struct Checkpointer {
    client: Arc<dyn PersistenceClient>,
}

impl Checkpointer {
    pub fn new(client: Arc<dyn PersistenceClient>) -> Self {
        Self { client }
    }

    pub async fn save(&self, ctx: &PersistenceContext, node: NodeType, state: &PlannerState) {
        match self.client.save_checkpoint(&ctx.thread_id, node.as_str(), state).await {
            Ok(checkpoint) => tracing::trace!(
                thread_id = %ctx.thread_id,
                checkpoint_id = %checkpoint.checkpoint_id,
                node = %node,
                "checkpoint saved"
            ),
            Err(e) => tracing::error!(
                thread_id = %ctx.thread_id,
                node = %node,
                error = %e,
                "failed to save checkpoint"
            ),
        }
    }
}
