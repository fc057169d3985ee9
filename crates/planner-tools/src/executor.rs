use crate::memory::{ManageMemory, MemoryStore, SearchMemory};
use crate::search::Search;
use crate::tool::{Tool, ToolContext};
use crate::web::{AnalyzeWebsite, ScrapeWebsite, WebFetcher};
use anyhow::Result;
use planner_llm::ChatClient;
use serde_json::Value;
use std::sync::Arc;

/// Name-indexed registry of tools; registration order is the order tools are offered in
#[derive(Clone, Default)]
pub struct ToolExecutor {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any existing tool with the same name
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.retain(|t| t.name() != tool.name());
        self.tools.push(tool);
    }

    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name).cloned()
    }

    pub fn list_tools(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name().to_string()).collect()
    }

    /// Tool definitions in LLM format, restricted to `filter` when given
    pub fn get_llm_tools(&self, filter: Option<&[&str]>) -> Vec<planner_llm::Tool> {
        self.tools
            .iter()
            .filter(|t| filter.map_or(true, |names| names.contains(&t.name())))
            .map(|t| t.definition())
            .collect()
    }

    /// Execute a tool by name
    pub async fn execute_tool(&self, tool_name: &str, arguments: Value, ctx: &ToolContext) -> Result<String> {
        let tool = self
            .get(tool_name)
            .ok_or_else(|| anyhow::anyhow!("Tool '{}' not found", tool_name))?;

        tracing::debug!(tool = tool_name, "executing tool");
        tool.call(arguments, ctx).await
    }
}

/// The planner's research tool set. Search is left out when no search backend is given.
pub fn research_tools(
    llm_client: Arc<dyn ChatClient>,
    memory: Arc<MemoryStore>,
    search: Option<Search>,
) -> Result<ToolExecutor> {
    let fetcher = WebFetcher::new()?;
    let mut executor = ToolExecutor::new();

    match search {
        Some(search) => executor.register(Arc::new(search)),
        None => tracing::warn!("no search backend configured, Search tool disabled"),
    }

    executor.register(Arc::new(ScrapeWebsite::new(fetcher.clone(), llm_client.clone())));
    executor.register(Arc::new(AnalyzeWebsite::new(fetcher, llm_client)));
    executor.register(Arc::new(ManageMemory::new(memory.clone())));
    executor.register(Arc::new(SearchMemory::new(memory)));

    Ok(executor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    struct Echo(&'static str);

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            "Echo the arguments"
        }

        fn parameters(&self) -> Value {
            json!({ "type": "object" })
        }

        async fn call(&self, args: Value, _ctx: &ToolContext) -> Result<String> {
            Ok(args.to_string())
        }
    }

    #[tokio::test]
    async fn test_execute_registered_tool() {
        let executor = ToolExecutor::new().with_tool(Arc::new(Echo("Search")));
        let ctx = ToolContext::new("openai/gpt-4o");

        let out = executor
            .execute_tool("Search", json!({ "query": "x" }), &ctx)
            .await
            .unwrap();

        assert_eq!(out, r#"{"query":"x"}"#);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_error() {
        let executor = ToolExecutor::new();
        let err = executor
            .execute_tool("Nope", json!({}), &ToolContext::new("m"))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Tool 'Nope' not found"));
    }

    #[test]
    fn test_filter_and_order() {
        let executor = ToolExecutor::new()
            .with_tool(Arc::new(Echo("A")))
            .with_tool(Arc::new(Echo("B")))
            .with_tool(Arc::new(Echo("C")));

        let names: Vec<_> = executor
            .get_llm_tools(Some(&["C", "A"][..]))
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["A", "C"]);
        assert_eq!(executor.get_llm_tools(None).len(), 3);
    }

    #[test]
    fn test_register_replaces_same_name() {
        let mut executor = ToolExecutor::new().with_tool(Arc::new(Echo("A")));
        executor.register(Arc::new(Echo("A")));
        assert_eq!(executor.list_tools(), vec!["A"]);
    }
}
