use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::StreamExt;
use marketing_planner::persist::ThreadStatus;
use marketing_planner::prelude::*;
use marketing_planner::PlannerState;
use marketing_planner::tools::ToolExecutor;
use marketing_planner::llm::{ChatClient, ChatRequest, ChatResponse, ChatStream, ToolCall};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

struct ScriptedClient {
    replies: Mutex<VecDeque<ChatResponse>>,
}

#[async_trait]
impl ChatClient for ScriptedClient {
    async fn chat(&self, _request: ChatRequest) -> Result<ChatResponse> {
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow!("script exhausted"))
    }

    async fn chat_stream(&self, request: ChatRequest) -> Result<ChatStream> {
        let response = self.chat(request).await?;
        let events: Vec<_> = response
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(index, call)| {
                Ok(marketing_planner::llm::StreamEvent::ToolCall {
                    index: index as u32,
                    id: Some(call.id),
                    name: Some(call.name),
                    arguments: Some(call.arguments),
                })
            })
            .collect();
        Ok(Box::pin(futures::stream::iter(events)))
    }
}

fn reply(id: &str, name: &str, args: Value) -> ChatResponse {
    ChatResponse {
        content: None,
        tool_calls: Some(vec![ToolCall::new(id, name, &args)]),
        usage: None,
        finish_reason: Some("tool_calls".to_string()),
        raw: Value::Null,
    }
}

fn plan() -> ChatResponse {
    reply(
        "plan",
        "MarketingPlan",
        json!({
            "business_overview": { "industry": "Coffee" },
            "recommended_channels": ["Instagram"]
        }),
    )
}

fn accept() -> ChatResponse {
    reply(
        "review",
        "MarketingPlanIsSatisfactory",
        json!({ "reason": ["fits"], "is_satisfactory": true }),
    )
}

fn ask() -> ChatResponse {
    reply(
        "ask",
        "AskUserInput",
        json!({ "question": "What budget do you have?", "options": ["< $1k", "> $1k"] }),
    )
}

fn planner(replies: Vec<ChatResponse>) -> Planner {
    PlannerBuilder::new()
        .llm_client(Arc::new(ScriptedClient {
            replies: Mutex::new(replies.into()),
        }))
        .tools(ToolExecutor::new())
        .max_loops(3)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_chat_returns_reviewed_plan() {
    let planner = planner(vec![plan(), accept()]);

    let outcome = planner.chat("Plan for https://beans.shop").await.unwrap();

    match outcome {
        Outcome::Plan(plan) => {
            assert_eq!(plan.business_overview.industry, "Coffee");
            assert_eq!(plan.recommended_channels, vec!["Instagram"]);
        }
        other => panic!("expected a plan, got {:?}", other),
    }
}

#[tokio::test]
async fn test_question_then_answer_in_thread() {
    let planner = planner(vec![ask(), plan(), accept()]);
    let thread_id = planner.start_thread().await.unwrap();

    let first = planner.chat_in_thread(&thread_id, "Help me market acme.com").await.unwrap();
    assert_eq!(
        first,
        Outcome::Question {
            question: "What budget do you have?".to_string(),
            options: vec!["< $1k".to_string(), "> $1k".to_string()],
        }
    );

    let thread = planner.persist().get_thread(&thread_id).await.unwrap().unwrap();
    assert_eq!(thread.status, ThreadStatus::Interrupted);

    let second = planner.chat_in_thread(&thread_id, "< $1k").await.unwrap();
    assert!(matches!(second, Outcome::Plan(_)));

    let state = planner.state(&thread_id).await.unwrap().unwrap();
    assert_eq!(state.user_preferences["budget"], "< $1k");
    assert!(state.research_progress.budget_confirmed);
}

#[tokio::test]
async fn test_chat_stream_releases_thread() {
    let planner = planner(vec![plan(), accept()]);
    let thread_id = planner.start_thread().await.unwrap();

    let events: Vec<StreamEvent> = planner
        .chat_stream(&thread_id, "Plan please")
        .await
        .unwrap()
        .collect()
        .await;

    assert!(matches!(events.first(), Some(StreamEvent::InitStream { .. })));
    assert!(matches!(
        events.last(),
        Some(StreamEvent::EndStream { status: RunStatus::Success, .. })
    ));

    let thread = planner.persist().get_thread(&thread_id).await.unwrap().unwrap();
    assert_eq!(thread.status, ThreadStatus::Idle);
}

#[tokio::test]
async fn test_busy_thread_is_rejected() {
    let planner = planner(vec![]);
    let thread_id = planner.start_thread().await.unwrap();
    planner.persist().set_status(&thread_id, ThreadStatus::Busy).await.unwrap();

    let err = tokio_test::assert_err!(planner.chat_in_thread(&thread_id, "hi").await);
    assert!(err.to_string().contains("busy"));
}

#[tokio::test]
async fn test_failed_run_marks_thread_error() {
    let planner = planner(vec![]);
    let thread_id = planner.start_thread().await.unwrap();

    tokio_test::assert_err!(planner.chat_in_thread(&thread_id, "hi").await);

    let thread = planner.persist().get_thread(&thread_id).await.unwrap().unwrap();
    assert_eq!(thread.status, ThreadStatus::Error);
}

#[test]
fn test_outcome_falls_back_to_reply_text() {
    let mut state = PlannerState::new("t1", RunConfig::default());
    state.add_message(Message::human("hi"));
    state.add_message(Message::ai("Hello! Which website should I look at?"));

    assert_eq!(
        Outcome::from_state(&state),
        Outcome::Reply("Hello! Which website should I look at?".to_string())
    );
}

#[tokio::test]
async fn test_rejected_plan_at_loop_limit_is_not_returned() {
    let reject = reply(
        "review",
        "MarketingPlanIsSatisfactory",
        json!({
            "reason": ["no budget split"],
            "is_satisfactory": false,
            "improvement_instructions": "Split the budget across channels"
        }),
    );
    let planner = PlannerBuilder::new()
        .llm_client(Arc::new(ScriptedClient {
            replies: Mutex::new(vec![plan(), reject].into()),
        }))
        .tools(ToolExecutor::new())
        .max_loops(1)
        .build()
        .unwrap();

    let outcome = planner.chat("Plan for https://beans.shop").await.unwrap();

    assert_eq!(
        outcome,
        Outcome::Reply("Unsatisfactory response:\nSplit the budget across channels".to_string())
    );
}
