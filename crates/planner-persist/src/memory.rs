use async_trait::async_trait;
use chrono::Utc;
use planner_types::PlannerState;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::{PersistError, Result};
use crate::models::{Checkpoint, Thread, ThreadSearch, ThreadStatus};
use crate::trait_client::PersistenceClient;

struct ThreadRecord {
    thread: Thread,
    checkpoints: Vec<Checkpoint>,
}

/// Checkpoints kept per thread unless configured otherwise
pub const DEFAULT_MAX_CHECKPOINTS: usize = 100;

/// Process-local thread store; contents are lost on restart
pub struct InMemoryPersistenceClient {
    threads: RwLock<HashMap<String, ThreadRecord>>,
    /// Checkpoints kept per thread; oldest are dropped first
    max_checkpoints: usize,
}

impl Default for InMemoryPersistenceClient {
    fn default() -> Self {
        Self {
            threads: RwLock::default(),
            max_checkpoints: DEFAULT_MAX_CHECKPOINTS,
        }
    }
}

impl InMemoryPersistenceClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap the history kept per thread. The thread's latest values are
    /// stored separately, so a cap of 1 still keeps state intact.
    pub fn with_max_checkpoints(mut self, max: usize) -> Self {
        self.max_checkpoints = max.max(1);
        self
    }
}

#[async_trait]
impl PersistenceClient for InMemoryPersistenceClient {
    async fn create_thread(&self, thread_id: Option<String>, metadata: Map<String, Value>) -> Result<Thread> {
        let thread_id = thread_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let mut threads = self.threads.write().await;

        if threads.contains_key(&thread_id) {
            return Err(PersistError::ThreadExists(thread_id));
        }

        let thread = Thread::new(thread_id.clone(), metadata);
        threads.insert(
            thread_id,
            ThreadRecord {
                thread: thread.clone(),
                checkpoints: Vec::new(),
            },
        );

        tracing::debug!(thread_id = %thread.thread_id, "thread created");
        Ok(thread)
    }

    async fn get_thread(&self, thread_id: &str) -> Result<Option<Thread>> {
        Ok(self
            .threads
            .read()
            .await
            .get(thread_id)
            .map(|record| record.thread.clone()))
    }

    async fn search_threads(&self, query: ThreadSearch) -> Result<Vec<Thread>> {
        let threads = self.threads.read().await;

        let mut found: Vec<Thread> = threads
            .values()
            .map(|record| &record.thread)
            .filter(|thread| query.status.map_or(true, |status| thread.status == status))
            .filter(|thread| thread.matches_metadata(&query.metadata))
            .cloned()
            .collect();

        found.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(found
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect())
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        self.threads
            .write()
            .await
            .remove(thread_id)
            .map(|_| ())
            .ok_or_else(|| PersistError::ThreadNotFound(thread_id.to_string()))
    }

    async fn set_status(&self, thread_id: &str, status: ThreadStatus) -> Result<()> {
        let mut threads = self.threads.write().await;
        let record = threads
            .get_mut(thread_id)
            .ok_or_else(|| PersistError::ThreadNotFound(thread_id.to_string()))?;

        record.thread.status = status;
        record.thread.updated_at = Utc::now();
        Ok(())
    }

    async fn acquire_for_run(&self, thread_id: &str) -> Result<Thread> {
        let mut threads = self.threads.write().await;
        let record = threads
            .get_mut(thread_id)
            .ok_or_else(|| PersistError::ThreadNotFound(thread_id.to_string()))?;

        if record.thread.status == ThreadStatus::Busy {
            return Err(PersistError::ThreadBusy(thread_id.to_string()));
        }

        record.thread.status = ThreadStatus::Busy;
        record.thread.updated_at = Utc::now();
        Ok(record.thread.clone())
    }

    async fn save_checkpoint(&self, thread_id: &str, node: &str, values: &PlannerState) -> Result<Checkpoint> {
        let mut threads = self.threads.write().await;
        let record = threads
            .get_mut(thread_id)
            .ok_or_else(|| PersistError::ThreadNotFound(thread_id.to_string()))?;

        let checkpoint = Checkpoint {
            checkpoint_id: uuid::Uuid::new_v4().to_string(),
            thread_id: thread_id.to_string(),
            run_id: values.run_id.clone(),
            node: node.to_string(),
            created_at: Utc::now(),
            values: values.clone(),
        };

        record.thread.values = Some(values.clone());
        record.thread.updated_at = checkpoint.created_at;
        record.checkpoints.push(checkpoint.clone());

        let excess = record.checkpoints.len().saturating_sub(self.max_checkpoints);
        record.checkpoints.drain(..excess);

        Ok(checkpoint)
    }

    async fn get_history(&self, thread_id: &str, limit: Option<usize>) -> Result<Vec<Checkpoint>> {
        let threads = self.threads.read().await;
        let record = threads
            .get(thread_id)
            .ok_or_else(|| PersistError::ThreadNotFound(thread_id.to_string()))?;

        Ok(record
            .checkpoints
            .iter()
            .rev()
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }
}
