use chrono::{DateTime, Utc};
use planner_types::{PlannerState, RunStatus};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreadStatus {
    #[default]
    Idle,
    Busy,
    /// Last run stopped to ask the user a question
    Interrupted,
    Error,
}

impl From<RunStatus> for ThreadStatus {
    /// Status a thread is left in once a run on it ends
    fn from(status: RunStatus) -> Self {
        match status {
            RunStatus::Success => Self::Idle,
            RunStatus::Interrupted => Self::Interrupted,
            RunStatus::Error => Self::Error,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub thread_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    pub status: ThreadStatus,
    #[serde(default)]
    pub values: Option<PlannerState>,
}

impl Thread {
    pub fn new(thread_id: impl Into<String>, metadata: Map<String, Value>) -> Self {
        let now = Utc::now();
        Self {
            thread_id: thread_id.into(),
            created_at: now,
            updated_at: now,
            metadata,
            status: ThreadStatus::Idle,
            values: None,
        }
    }

    /// Every key of `filter` must be present with an equal value
    pub fn matches_metadata(&self, filter: &Map<String, Value>) -> bool {
        filter
            .iter()
            .all(|(key, value)| self.metadata.get(key) == Some(value))
    }
}

/// State snapshot taken after a node completed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub checkpoint_id: String,
    pub thread_id: String,
    pub run_id: String,
    pub node: String,
    pub created_at: DateTime<Utc>,
    pub values: PlannerState,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadSearch {
    pub metadata: Map<String, Value>,
    pub status: Option<ThreadStatus>,
    pub limit: usize,
    pub offset: usize,
}

impl Default for ThreadSearch {
    fn default() -> Self {
        Self {
            metadata: Map::new(),
            status: None,
            limit: 10,
            offset: 0,
        }
    }
}
