use crate::node::{EventSender, Node, NodeType};
use crate::prompts;
use crate::tools::{plan_review_tool, PlanVerdict, MARKETING_PLAN, PLAN_REVIEW};
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use planner_llm::{ChatClient, ChatOptions, ChatRequest, Message, ToolChoice};
use planner_types::{PlanReview, PlannerState, StreamEvent};
use std::sync::Arc;

/// Reviews a proposed plan with a second model call and answers the
/// `MarketingPlan` tool call with the verdict
pub struct ReflectNode {
    client: Arc<dyn ChatClient>,
}

impl ReflectNode {
    pub fn new(client: Arc<dyn ChatClient>) -> Self {
        Self { client }
    }

    async fn review(&self, state: &PlannerState) -> Result<PlanVerdict> {
        let mut messages = Vec::with_capacity(state.messages.len() + 1);
        messages.push(Message::human(prompts::main_prompt(state.website_url.as_deref())));
        messages.extend(state.messages[..state.messages.len() - 1].iter().cloned());
        messages.push(Message::human(prompts::checker_prompt(state)?));

        let options = ChatOptions::sampling(state.config.temperature, state.config.max_tokens)
            .tools(vec![plan_review_tool()])
            .tool_choice(ToolChoice::force(PLAN_REVIEW));

        let request = ChatRequest::new(state.config.model.clone(), messages).with_options(options);
        let response = self.client.chat(request).await?;

        let call = response
            .tool_call(PLAN_REVIEW)
            .ok_or_else(|| anyhow!("Reviewer did not return a {} verdict", PLAN_REVIEW))?;
        Ok(call.parse_arguments()?)
    }
}

#[async_trait]
impl Node for ReflectNode {
    async fn execute(&self, state: &mut PlannerState, event_tx: EventSender) -> Result<()> {
        let plan_call = match state.last_message() {
            Some(message) if message.is_ai() => message
                .tool_calls()
                .iter()
                .find(|c| c.name() == MARKETING_PLAN)
                .cloned(),
            _ => bail!("reflect expects the last message to be an AI message with tool calls"),
        };
        let plan_call = plan_call.ok_or_else(|| anyhow!("reflect expects a {} tool call", MARKETING_PLAN))?;

        let verdict = self.review(state).await?;
        state.plan_revision_count += 1;

        let accepted = verdict.is_satisfactory && state.marketing_plan.is_some();
        let feedback = if accepted {
            verdict.reason.join("\n")
        } else {
            let instructions = verdict
                .improvement_instructions
                .clone()
                .unwrap_or_else(|| verdict.reason.join("\n"));
            format!("Unsatisfactory response:\n{}", instructions)
        };

        tracing::info!(
            revision = state.plan_revision_count,
            accepted,
            "marketing plan reviewed"
        );

        state.last_review = Some(PlanReview {
            is_satisfactory: accepted,
            reasons: verdict.reason,
            improvement_instructions: verdict.improvement_instructions,
        });
        state.add_tool_result(plan_call.id, feedback.clone());

        event_tx
            .send(StreamEvent::PlanReviewed {
                is_satisfactory: accepted,
                revision: state.plan_revision_count,
                feedback,
            })
            .await?;

        Ok(())
    }

    fn node_type(&self) -> NodeType {
        NodeType::Reflect
    }
}
