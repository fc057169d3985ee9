use crate::node::{EventSender, Node, NodeType};
use anyhow::Result;
use async_trait::async_trait;
use planner_tools::{names, ToolContext, ToolExecutor};
use planner_types::{PlannerState, ResearchProgress, StreamEvent};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

const CHANNEL_KEYWORDS: [&str; 3] = ["channel", "platform", "advertising"];

/// Runs every pending tool call of the last assistant turn
pub struct ToolNode {
    executor: Arc<ToolExecutor>,
}

impl ToolNode {
    pub fn new(executor: Arc<ToolExecutor>) -> Self {
        Self { executor }
    }

    async fn call(&self, name: &str, arguments: &str, ctx: &ToolContext) -> Result<(Value, String)> {
        let args: Value = if arguments.trim().is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_str(arguments)?
        };
        let result = self.executor.execute_tool(name, args.clone(), ctx).await?;
        Ok((args, result))
    }
}

/// Mark research milestones reached by a successful call
pub fn record_progress(progress: &mut ResearchProgress, tool_name: &str, args: &Value) {
    match tool_name {
        names::ANALYZE_WEBSITE => progress.website_analyzed = true,
        names::SEARCH => {
            let query = args
                .get("query")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_lowercase();
            if query.contains("competitor") {
                progress.competitors_analyzed = true;
            }
            if CHANNEL_KEYWORDS.iter().any(|k| query.contains(k)) {
                progress.channels_researched = true;
            }
        }
        _ => {}
    }
}

#[async_trait]
impl Node for ToolNode {
    async fn execute(&self, state: &mut PlannerState, event_tx: EventSender) -> Result<()> {
        let tool_calls = state.pending_tool_calls();

        if tool_calls.is_empty() {
            return Ok(());
        }

        let ctx = ToolContext::new(state.config.model.clone())
            .with_max_search_results(state.config.max_search_results)
            .with_marketing_plan(state.marketing_plan.clone());

        for tool_call in tool_calls {
            let start = Instant::now();
            let tool_name = tool_call.name().to_string();

            let (result, is_error) = match self.call(&tool_name, &tool_call.arguments, &ctx).await {
                Ok((args, result)) => {
                    record_progress(&mut state.research_progress, &tool_name, &args);
                    (result, false)
                }
                Err(e) => {
                    // Resilient: the model sees the failure and can recover
                    tracing::warn!(tool = %tool_name, error = %e, "tool call failed");
                    (format!("Tool execution failed: {}", e), true)
                }
            };

            event_tx
                .send(StreamEvent::ToolResult {
                    tool_call_id: tool_call.id.clone(),
                    tool_name,
                    result: result.clone(),
                    is_error,
                    duration_ms: start.elapsed().as_millis() as u64,
                })
                .await?;

            state.add_tool_result(tool_call.id, result);
        }

        Ok(())
    }

    fn node_type(&self) -> NodeType {
        NodeType::Tools
    }
}
