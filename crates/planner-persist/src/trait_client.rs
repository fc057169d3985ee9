use async_trait::async_trait;
use planner_types::PlannerState;
use serde_json::{Map, Value};

use crate::error::Result;
use crate::models::{Checkpoint, Thread, ThreadSearch, ThreadStatus};

/// Storage operations for conversation threads and their checkpoints
#[async_trait]
pub trait PersistenceClient: Send + Sync {
    /// Create a thread; a generated id is used when none is given
    async fn create_thread(&self, thread_id: Option<String>, metadata: Map<String, Value>) -> Result<Thread>;

    async fn get_thread(&self, thread_id: &str) -> Result<Option<Thread>>;

    /// Threads matching the filter, most recently updated first
    async fn search_threads(&self, query: ThreadSearch) -> Result<Vec<Thread>>;

    /// Delete a thread and its checkpoints
    async fn delete_thread(&self, thread_id: &str) -> Result<()>;

    async fn set_status(&self, thread_id: &str, status: ThreadStatus) -> Result<()>;

    /// Mark the thread busy, failing if a run already holds it
    async fn acquire_for_run(&self, thread_id: &str) -> Result<Thread>;

    /// Store a snapshot and make it the thread's current values
    async fn save_checkpoint(&self, thread_id: &str, node: &str, values: &PlannerState) -> Result<Checkpoint>;

    /// Checkpoints, newest first
    async fn get_history(&self, thread_id: &str, limit: Option<usize>) -> Result<Vec<Checkpoint>>;
}
