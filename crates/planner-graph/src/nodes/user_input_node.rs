use crate::node::{EventSender, Node, NodeType};
use crate::tools::{AskUserInputArgs, ASK_USER_INPUT};
use anyhow::Result;
use async_trait::async_trait;
use planner_llm::Message;
use planner_types::{PlannerState, StreamEvent};

/// Folds the user's reply to an `AskUserInput` question back into the state
pub struct UserInputNode;

impl UserInputNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for UserInputNode {
    fn default() -> Self {
        Self::new()
    }
}

/// Store an answer under the preference its question was about
pub fn apply_answer(state: &mut PlannerState, question: &str, context: Option<&str>, answer: &str) {
    let question = question.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| question.contains(w));

    if has(&["budget"]) {
        state.user_preferences.insert("budget".into(), answer.into());
        state.research_progress.budget_confirmed = true;
    } else if has(&["timeline", "launch"]) {
        state.user_preferences.insert("timeline".into(), answer.into());
        state.research_progress.timeline_confirmed = true;
    } else if has(&["channel", "platform"]) {
        state.user_preferences.insert("preferred_channels".into(), answer.into());
    } else if has(&["goal", "objective"]) {
        state.user_preferences.insert("marketing_goals".into(), answer.into());
    } else if has(&["industry", "business"]) {
        state.research_progress.website_analyzed = true;
    } else {
        let key = match context {
            Some(context) if !context.is_empty() => context.to_lowercase().replace(' ', "_"),
            _ => "user_input".to_string(),
        };
        state.user_preferences.insert(key, answer.into());
    }
}

#[async_trait]
impl Node for UserInputNode {
    async fn execute(&self, state: &mut PlannerState, event_tx: EventSender) -> Result<()> {
        let Some((call_idx, call)) = state.find_unanswered_call(ASK_USER_INPUT) else {
            state.awaiting_user_input = false;
            return Ok(());
        };

        // The reply is the newest human turn after the question
        let reply_positions: Vec<usize> = state.messages[call_idx + 1..]
            .iter()
            .enumerate()
            .filter(|(_, m)| m.is_human())
            .map(|(offset, _)| call_idx + 1 + offset)
            .collect();
        let answer = reply_positions
            .last()
            .map(|&idx| state.messages[idx].text())
            .unwrap_or_default();

        let args: AskUserInputArgs = call.parse_arguments().unwrap_or_default();
        let context = args.context.or_else(|| state.last_question_context.clone());
        apply_answer(state, &args.question, context.as_deref(), &answer);

        // The tool result must directly follow the question it answers
        let insert_at = reply_positions.first().copied().unwrap_or(state.messages.len());
        state.insert_message(insert_at, Message::tool_result(call.id.clone(), answer.clone()));
        state.awaiting_user_input = false;

        tracing::debug!(question = %args.question, "user answer recorded");

        event_tx
            .send(StreamEvent::ToolResult {
                tool_call_id: call.id,
                tool_name: ASK_USER_INPUT.to_string(),
                result: answer,
                is_error: false,
                duration_ms: 0,
            })
            .await?;

        Ok(())
    }

    fn node_type(&self) -> NodeType {
        NodeType::ProcessUserInput
    }
}
