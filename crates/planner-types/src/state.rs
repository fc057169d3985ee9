use crate::config::RunConfig;
use planner_llm::{Message, ToolCall};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Research milestones shown to the model on every agent call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchProgress {
    pub website_analyzed: bool,
    pub competitors_analyzed: bool,
    pub channels_researched: bool,
    pub budget_confirmed: bool,
    pub timeline_confirmed: bool,
}

impl ResearchProgress {
    /// Labelled flags, in display order
    pub fn items(&self) -> [(&'static str, bool); 5] {
        [
            ("Website Analyzed", self.website_analyzed),
            ("Competitors Analyzed", self.competitors_analyzed),
            ("Channels Researched", self.channels_researched),
            ("Budget Confirmed", self.budget_confirmed),
            ("Timeline Confirmed", self.timeline_confirmed),
        ]
    }
}

/// Verdict of the last plan review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanReview {
    pub is_satisfactory: bool,
    pub reasons: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub improvement_instructions: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerState {
    pub conversation_id: String,
    pub run_id: String,
    #[serde(default)]
    pub website_url: Option<String>,
    pub messages: Vec<Message>,
    #[serde(default)]
    pub marketing_plan: Option<serde_json::Value>,
    #[serde(default)]
    pub loop_step: u32,
    #[serde(default)]
    pub awaiting_user_input: bool,
    #[serde(default)]
    pub plan_revision_count: u32,
    #[serde(default)]
    pub user_preferences: BTreeMap<String, String>,
    #[serde(default)]
    pub last_question_context: Option<String>,
    #[serde(default)]
    pub research_progress: ResearchProgress,
    #[serde(default)]
    pub last_review: Option<PlanReview>,
    #[serde(default)]
    pub config: RunConfig,
}

impl PlannerState {
    pub fn new(conversation_id: impl Into<String>, config: RunConfig) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            run_id: uuid::Uuid::new_v4().to_string(),
            website_url: None,
            messages: Vec::new(),
            marketing_plan: None,
            loop_step: 0,
            awaiting_user_input: false,
            plan_revision_count: 0,
            user_preferences: BTreeMap::new(),
            last_question_context: None,
            research_progress: ResearchProgress::default(),
            last_review: None,
            config,
        }
    }

    /// Continue a thread's state (or start one) with the messages of a new run.
    ///
    /// The loop counter is per run; everything else carries over.
    pub fn from_input(input: PlannerInput) -> Self {
        let mut state = match input.prior_state {
            Some(mut prior) => {
                prior.run_id = uuid::Uuid::new_v4().to_string();
                prior.loop_step = 0;
                prior.config = input.config;
                prior
            }
            None => Self::new(input.conversation_id, input.config),
        };

        if let Some(url) = input.website_url {
            state.website_url = Some(url);
        }
        if state.website_url.is_none() {
            state.website_url = input
                .messages
                .iter()
                .filter(|m| m.is_human())
                .find_map(|m| extract_url(&m.text()));
        }

        state.messages.extend(input.messages.into_iter().map(with_stable_id));
        state
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Append a turn, giving it an id if it has none
    pub fn add_message(&mut self, message: Message) {
        self.messages.push(with_stable_id(message));
    }

    pub fn insert_message(&mut self, index: usize, message: Message) {
        self.messages.insert(index, with_stable_id(message));
    }

    /// Tool calls of the last message, if it is an assistant turn
    pub fn pending_tool_calls(&self) -> Vec<ToolCall> {
        self.last_message()
            .map(|m| m.tool_calls().to_vec())
            .unwrap_or_default()
    }

    pub fn has_pending_tool_calls(&self) -> bool {
        self.last_message()
            .map(|m| !m.tool_calls().is_empty())
            .unwrap_or(false)
    }

    pub fn add_tool_result(&mut self, tool_call_id: impl Into<String>, result: impl Into<String>) {
        self.add_message(Message::tool_result(tool_call_id, result.into()));
    }

    /// Ids of tool calls that have been answered with a tool result
    fn answered_call_ids(&self) -> Vec<&str> {
        self.messages.iter().filter_map(Message::answers).collect()
    }

    /// Most recent call to `tool_name` that has no tool result yet
    pub fn find_unanswered_call(&self, tool_name: &str) -> Option<(usize, ToolCall)> {
        let answered = self.answered_call_ids();
        self.messages.iter().enumerate().rev().find_map(|(idx, m)| {
            m.tool_calls()
                .iter()
                .find(|c| c.name() == tool_name && !answered.contains(&c.id.as_str()))
                .map(|c| (idx, c.clone()))
        })
    }

    /// Answer every tool call in the transcript that has no result yet.
    ///
    /// Each result lands after the tool results already following its
    /// assistant turn, so a run that died mid-loop leaves a transcript the
    /// providers still accept. Returns how many calls were answered.
    pub fn answer_unanswered_calls(&mut self, result_for: impl Fn(&ToolCall) -> String) -> usize {
        let answered: Vec<String> = self.answered_call_ids().into_iter().map(str::to_string).collect();
        let mut messages = Vec::with_capacity(self.messages.len());
        let mut pending: Vec<ToolCall> = Vec::new();
        let mut count = 0;

        for message in std::mem::take(&mut self.messages) {
            if !matches!(message, Message::Tool { .. }) {
                count += pending.len();
                for call in pending.drain(..) {
                    let result = result_for(&call);
                    messages.push(with_stable_id(Message::tool_result(call.id, result)));
                }
            }
            pending.extend(
                message
                    .tool_calls()
                    .iter()
                    .filter(|c| !answered.contains(&c.id))
                    .cloned(),
            );
            messages.push(message);
        }

        count += pending.len();
        for call in pending {
            let result = result_for(&call);
            messages.push(with_stable_id(Message::tool_result(call.id, result)));
        }

        self.messages = messages;
        count
    }

    /// Count calls to any of `names` across the last `window` messages
    pub fn recent_tool_call_count(&self, window: usize, names: &[&str]) -> usize {
        let start = self.messages.len().saturating_sub(window);
        self.messages[start..]
            .iter()
            .flat_map(|m| m.tool_calls())
            .filter(|c| names.contains(&c.name()))
            .count()
    }
}

/// Ids survive later insertions, unlike positions in the transcript
fn with_stable_id(message: Message) -> Message {
    if message.id().is_some() {
        return message;
    }
    message.with_id(uuid::Uuid::new_v4().to_string())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerInput {
    pub conversation_id: String,
    #[serde(default)]
    pub prior_state: Option<PlannerState>,
    pub messages: Vec<Message>,
    #[serde(default)]
    pub website_url: Option<String>,
    #[serde(default)]
    pub config: RunConfig,
}

impl PlannerInput {
    pub fn new(conversation_id: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            prior_state: None,
            messages,
            website_url: None,
            config: RunConfig::default(),
        }
    }

    pub fn with_prior_state(mut self, state: Option<PlannerState>) -> Self {
        self.prior_state = state;
        self
    }

    pub fn with_website_url(mut self, url: impl Into<String>) -> Self {
        self.website_url = Some(url.into());
        self
    }

    pub fn with_config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }
}

/// First http(s) or www. token in free text, without trailing punctuation
pub fn extract_url(text: &str) -> Option<String> {
    text.split_whitespace()
        .map(|token| token.trim_matches(|c: char| matches!(c, '<' | '>' | '(' | ')' | '"' | '\'')))
        .find(|token| {
            token.starts_with("http://") || token.starts_with("https://") || token.starts_with("www.")
        })
        .map(|token| token.trim_end_matches(['.', ',', ';', ':', '!', '?']).to_string())
        .filter(|url| url.len() > "www.".len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_url() {
        assert_eq!(
            extract_url("Please build a plan for https://acme.com."),
            Some("https://acme.com".to_string())
        );
        assert_eq!(extract_url("see (www.acme.io)"), Some("www.acme.io".to_string()));
        assert_eq!(extract_url("hello there"), None);
    }

    #[test]
    fn test_from_input_detects_website() {
        let input = PlannerInput::new("t1", vec![Message::human("My site is https://beans.shop")]);
        let state = PlannerState::from_input(input);

        assert_eq!(state.website_url.as_deref(), Some("https://beans.shop"));
        assert_eq!(state.messages.len(), 1);
    }

    #[test]
    fn test_answer_unanswered_calls_mid_transcript() {
        let mut state = PlannerState::new("t1", RunConfig::default());
        state.add_message(Message::human("plan for acme.com"));
        state.add_message(Message::ai_with_tools(vec![
            ToolCall::new("c1", "search", &json!({"query": "acme"})),
            ToolCall::new("c2", "scrape_website", &json!({"url": "acme.com"})),
        ]));
        state.add_tool_result("c1", "results");
        state.add_message(Message::ai_with_tools(vec![ToolCall::new("p1", "MarketingPlan", &json!({}))]));
        state.add_message(Message::human("try again"));

        let answered = state.answer_unanswered_calls(|call| format!("skipped {}", call.name()));

        assert_eq!(answered, 2);
        let order: Vec<_> = state
            .messages
            .iter()
            .map(|m| m.answers().map(str::to_string).unwrap_or_else(|| m.role().to_string()))
            .collect();
        assert_eq!(order, vec!["user", "assistant", "c1", "c2", "assistant", "p1", "user"]);
        assert_eq!(state.messages[3].text(), "skipped scrape_website");
        assert_eq!(state.answer_unanswered_calls(|_| String::new()), 0);
    }

    #[test]
    fn test_from_input_continues_prior_state() {
        let mut prior = PlannerState::new("t1", RunConfig::default());
        prior.loop_step = 4;
        prior.user_preferences.insert("budget".into(), "$500".into());
        prior.add_message(Message::human("hi"));
        let prior_run = prior.run_id.clone();

        let state = PlannerState::from_input(
            PlannerInput::new("t1", vec![Message::human("more")]).with_prior_state(Some(prior)),
        );

        assert_ne!(state.run_id, prior_run);
        assert_eq!(state.loop_step, 0);
        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.user_preferences["budget"], "$500");
    }

    #[test]
    fn test_unanswered_call_lookup() {
        let mut state = PlannerState::new("t1", RunConfig::default());
        state.add_message(Message::ai_with_tools(vec![ToolCall::new(
            "ask_1",
            "AskUserInput",
            &json!({ "question": "Budget?" }),
        )]));

        let (idx, call) = state.find_unanswered_call("AskUserInput").unwrap();
        assert_eq!(idx, 0);
        assert_eq!(call.id, "ask_1");

        state.add_tool_result("ask_1", "$1000");
        assert!(state.find_unanswered_call("AskUserInput").is_none());
    }

    #[test]
    fn test_recent_tool_call_count_window() {
        let mut state = PlannerState::new("t1", RunConfig::default());
        for i in 0..3 {
            state.add_message(Message::ai_with_tools(vec![ToolCall::new(
                format!("m{}", i),
                "SearchMemory",
                &json!({ "query": "x" }),
            )]));
            state.add_tool_result(format!("m{}", i), "[]");
        }

        // last 5 messages: m0 result, m1 call, m1 result, m2 call, m2 result
        assert_eq!(state.recent_tool_call_count(5, &["SearchMemory", "ManageMemory"]), 2);
        assert_eq!(state.recent_tool_call_count(6, &["SearchMemory"]), 3);
    }
}
