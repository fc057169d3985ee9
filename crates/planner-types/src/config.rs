use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "anthropic/claude-3-5-sonnet-20240620";

/// Limits applied to every run of a graph, whatever the thread
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Upper bound on node executions in a single run
    pub max_iterations: usize,
    /// Wall-clock budget for a whole run, model calls and tools included
    pub execution_timeout: Duration,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            execution_timeout: Duration::from_secs(600),
        }
    }
}

impl GraphConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.execution_timeout = timeout;
        self
    }
}

/// Per-run knobs, overridable from a request's `config.configurable`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub model: String,
    /// Agent-model calls allowed before a reviewed plan is accepted as final
    pub max_loops: u32,
    pub max_search_results: usize,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_loops: 6,
            max_search_results: 10,
            temperature: None,
            max_tokens: None,
        }
    }
}

impl RunConfig {
    /// Overlay the recognised keys of a JSON object; unknown keys are ignored
    pub fn with_overrides(&self, overrides: &serde_json::Value) -> Result<Self, serde_json::Error> {
        let mut base = serde_json::to_value(self)?;
        if let (Some(base_obj), Some(over_obj)) = (base.as_object_mut(), overrides.as_object()) {
            for (key, value) in over_obj {
                if base_obj.contains_key(key) {
                    base_obj.insert(key.clone(), value.clone());
                }
            }
        }
        serde_json::from_value(base)
    }
}
