use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Per-call context handed to every tool
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Model used by tools that summarise with the LLM ("provider/model")
    pub model: String,
    pub max_search_results: usize,
    /// Plan proposed so far, used to focus scraping notes
    pub marketing_plan: Option<Value>,
}

impl ToolContext {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            max_search_results: 10,
            marketing_plan: None,
        }
    }

    pub fn with_max_search_results(mut self, max: usize) -> Self {
        self.max_search_results = max;
        self
    }

    pub fn with_marketing_plan(mut self, plan: Option<Value>) -> Self {
        self.marketing_plan = plan;
        self
    }
}

/// A capability the agent model can invoke by name
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the arguments object
    fn parameters(&self) -> Value;

    async fn call(&self, args: Value, ctx: &ToolContext) -> Result<String>;

    /// Definition in the format sent to the model
    fn definition(&self) -> planner_llm::Tool {
        planner_llm::Tool::new(self.name(), self.description(), self.parameters())
    }
}

/// Pull a required string argument out of a tool call
pub(crate) fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| anyhow::anyhow!("Missing required argument '{}'", key))
}
