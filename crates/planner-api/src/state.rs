use std::sync::Arc;

use chrono::{DateTime, Utc};

use planner_graph::Graph;
use planner_persist::PersistenceClient;

use crate::config::Config;

/// Shared application state passed to all handlers
///
/// The Graph is stateless and built once at startup; thread state lives in
/// the persistence client.
pub struct AppState {
    pub config: Config,
    pub persist: Arc<dyn PersistenceClient>,
    pub graph: Arc<Graph>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: Config, persist: Arc<dyn PersistenceClient>, graph: Graph) -> Self {
        Self {
            config,
            persist,
            graph: Arc::new(graph),
            started_at: Utc::now(),
        }
    }
}
