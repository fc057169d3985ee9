use crate::node::{EventSender, Node, NodeType};
use crate::prompts;
use crate::router::memory_tools_exhausted;
use crate::tools::{ask_user_input_tool, marketing_plan_tool, AskUserInputArgs, ASK_USER_INPUT, MARKETING_PLAN};
use anyhow::Result;
use async_trait::async_trait;
use futures::StreamExt;
use planner_llm::{
    ChatClient, ChatOptions, ChatRequest, ChatStream, Message, ResponseAccumulator, Tool, ToolCall, ToolChoice,
};
use planner_tools::{names, ToolExecutor};
use planner_types::{agent_message_id, PlannerState, StreamEvent};
use std::sync::Arc;

/// Calls the research model with the rebuilt system prompt and the bound tools
pub struct AgentNode {
    client: Arc<dyn ChatClient>,
    executor: Arc<ToolExecutor>,
}

impl AgentNode {
    pub fn new(client: Arc<dyn ChatClient>, executor: Arc<ToolExecutor>) -> Self {
        Self { client, executor }
    }

    /// Research tools, plus memory tools unless the model has been looping on them
    fn bound_tools(&self, include_memory: bool) -> Vec<Tool> {
        let mut allowed = vec![names::SCRAPE_WEBSITE, names::SEARCH, names::ANALYZE_WEBSITE];
        if include_memory {
            allowed.extend(names::MEMORY_TOOLS);
        }

        let mut tools = self.executor.get_llm_tools(Some(allowed.as_slice()));
        tools.push(marketing_plan_tool());
        tools.push(ask_user_input_tool());
        tools
    }

    async fn create_chat_stream(&self, state: &PlannerState, include_memory: bool) -> Result<ChatStream> {
        let prompt = prompts::agent_prompt(state);
        let messages = if state.messages.is_empty() {
            vec![Message::human(prompt)]
        } else {
            let mut messages = Vec::with_capacity(state.messages.len() + 1);
            messages.push(Message::system(prompt));
            messages.extend(state.messages.iter().cloned());
            messages
        };

        let options = ChatOptions::sampling(state.config.temperature, state.config.max_tokens)
            .tools(self.bound_tools(include_memory))
            .tool_choice(ToolChoice::required());

        let request = ChatRequest::new(state.config.model.clone(), messages).with_options(options);
        self.client.chat_stream(request).await
    }

    /// Forward deltas to the client while folding them into one assistant turn
    async fn process_stream(&self, mut stream: ChatStream, event_tx: &EventSender) -> Result<Message> {
        let mut acc = ResponseAccumulator::new();

        while let Some(event) = stream.next().await {
            let event = event?;
            acc.push(&event);
            event_tx.send(event.into()).await?;
        }

        Ok(acc.into_message())
    }
}

/// Calls cut short by the memory loop guard, or left behind by a run that
/// failed before its tools ran, still need a tool result
fn answer_dangling_calls(state: &mut PlannerState) {
    let answered = state.answer_unanswered_calls(|call| {
        if names::is_memory_tool(call.name()) {
            prompts::MEMORY_DISABLED.to_string()
        } else {
            format!("Tool call {} was skipped", call.name())
        }
    });
    if answered > 0 {
        tracing::debug!(answered, "answered dangling tool calls");
    }
}

fn with_single_call(message: Message, call: ToolCall) -> Message {
    match message {
        Message::AI { content, name, id, .. } => Message::AI {
            content,
            tool_calls: Some(vec![call]),
            name,
            id,
        },
        other => other,
    }
}

#[async_trait]
impl Node for AgentNode {
    async fn execute(&self, state: &mut PlannerState, event_tx: EventSender) -> Result<()> {
        // counted before the guard's placeholder results shift the window
        let include_memory = !memory_tools_exhausted(state);
        answer_dangling_calls(state);

        tracing::info!(
            model = %state.config.model,
            loop_step = state.loop_step,
            messages = state.messages.len(),
            "calling agent model"
        );

        let stream = self.create_chat_stream(state, include_memory).await?;
        let message = self
            .process_stream(stream, &event_tx)
            .await?
            .with_id(agent_message_id(&state.run_id, state.loop_step + 1));

        let calls = message.tool_calls().to_vec();
        let plan_call = calls.iter().find(|c| c.name() == MARKETING_PLAN).cloned();
        let ask_call = calls.iter().find(|c| c.name() == ASK_USER_INPUT).cloned();

        state.marketing_plan = None;
        state.awaiting_user_input = false;
        state.last_question_context = None;

        if let Some(call) = plan_call {
            match call.arguments_value() {
                Ok(plan) => state.marketing_plan = Some(plan),
                Err(e) => tracing::warn!(error = %e, "MarketingPlan arguments are not valid JSON"),
            }
            state.add_message(with_single_call(message, call));
        } else if let Some(call) = ask_call {
            let args: AskUserInputArgs = call.parse_arguments().unwrap_or_default();

            state.awaiting_user_input = true;
            state.last_question_context = args.context.clone();

            event_tx
                .send(StreamEvent::AwaitingInput {
                    question: args.question,
                    context: args.context,
                    options: args.options,
                })
                .await?;

            state.add_message(with_single_call(message, call));
        } else if calls.is_empty() {
            tracing::debug!("agent answered without a tool call, nudging");
            state.add_message(message);
            state.add_message(Message::human(prompts::TOOL_NUDGE));
        } else {
            state.add_message(message);
        }

        state.loop_step += 1;
        Ok(())
    }

    fn node_type(&self) -> NodeType {
        NodeType::Agent
    }
}
