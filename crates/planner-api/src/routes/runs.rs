use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::{self, Stream, StreamExt};
use planner_graph::PersistenceContext;
use planner_llm::Message;
use planner_persist::{PersistenceClient, ThreadStatus};
use planner_types::{PlannerInput, RunConfig, StreamEvent};
use serde::Deserialize;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use utoipa::ToSchema;

use crate::{
    error::{ApiError, ApiResult},
    routes::{assistants, threads::load_thread},
    sse::{RunEventMapper, StreamMode},
    state::AppState,
    wire,
};

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct RunRequest {
    pub assistant_id: Option<String>,
    /// `{ messages: [...], website_url? }`
    #[schema(value_type = Option<Object>)]
    pub input: Option<Value>,
    /// `{ resume: "answer" }` answers a pending question
    #[schema(value_type = Option<Object>)]
    pub command: Option<Value>,
    /// `{ configurable: { model, max_loops, max_search_results, ... } }`
    #[schema(value_type = Option<Object>)]
    pub config: Option<Value>,
    #[schema(value_type = Option<Object>)]
    pub stream_mode: Option<Value>,
    /// "create" starts a thread that does not exist yet
    pub if_not_exists: Option<String>,
}

/// What a run request asks for, validated before the thread is touched
struct ParsedRun {
    messages: Vec<Message>,
    website_url: Option<String>,
    config: RunConfig,
}

fn parse_run(req: &RunRequest, defaults: &RunConfig) -> ApiResult<ParsedRun> {
    if let Some(assistant_id) = &req.assistant_id {
        assistants::ensure_assistant(assistant_id)?;
    }

    let input = req.input.as_ref().filter(|v| !v.is_null());
    if let Some(input) = input {
        if !input.is_object() {
            return Err(ApiError::BadRequest("'input' must be an object".to_string()));
        }
    }

    let mut messages = wire::messages_from_wire(input.and_then(|i| i.get("messages")))?;

    if let Some(resume) = req.command.as_ref().and_then(|c| c.get("resume")) {
        match resume {
            Value::String(answer) => messages.push(Message::human(answer.as_str())),
            Value::Null => {}
            other => messages.push(Message::human(other.to_string())),
        }
    }

    let website_url = input
        .and_then(|i| i.get("website_url"))
        .and_then(Value::as_str)
        .map(str::to_string);

    let config = match req.config.as_ref().and_then(|c| c.get("configurable")) {
        Some(overrides) => defaults
            .with_overrides(overrides)
            .map_err(|e| ApiError::BadRequest(format!("invalid configurable: {}", e)))?,
        None => defaults.clone(),
    };

    Ok(ParsedRun {
        messages,
        website_url,
        config,
    })
}

/// Validate the request, claim the thread and start the graph.
///
/// The returned receiver carries the graph's events. A forwarding task owns
/// the thread status: it is released when the run ends, even if the client
/// stops listening.
async fn start_run(state: &AppState, thread_id: &str, req: &RunRequest) -> ApiResult<mpsc::Receiver<StreamEvent>> {
    let parsed = parse_run(req, &state.config.planner.run_config())?;

    if state.persist.get_thread(thread_id).await?.is_none() {
        if req.if_not_exists.as_deref() == Some("create") {
            state
                .persist
                .create_thread(Some(thread_id.to_string()), Default::default())
                .await?;
        } else {
            return Err(ApiError::ThreadNotFound(thread_id.to_string()));
        }
    }

    let thread = state.persist.acquire_for_run(thread_id).await?;

    let mut input = PlannerInput::new(thread_id, parsed.messages)
        .with_prior_state(thread.values)
        .with_config(parsed.config);
    if let Some(url) = parsed.website_url {
        input = input.with_website_url(url);
    }

    tracing::info!(thread_id = %thread_id, model = %input.config.model, "starting run");

    let events = state
        .graph
        .spawn_run(input, Some(PersistenceContext::new(thread_id)));

    Ok(forward_events(state.persist.clone(), thread_id.to_string(), events))
}

fn forward_events(
    persist: Arc<dyn PersistenceClient>,
    thread_id: String,
    mut events: mpsc::Receiver<StreamEvent>,
) -> mpsc::Receiver<StreamEvent> {
    let (tx, rx) = mpsc::channel(1000);

    tokio::spawn(async move {
        let mut final_status = ThreadStatus::Error;
        let mut listening = true;

        while let Some(event) = events.recv().await {
            if let Some(status) = event.end_status() {
                final_status = ThreadStatus::from(status);
            }
            if listening && tx.send(event).await.is_err() {
                tracing::debug!(thread_id = %thread_id, "client disconnected, run continues");
                listening = false;
            }
        }

        if let Err(e) = persist.set_status(&thread_id, final_status).await {
            tracing::warn!(thread_id = %thread_id, error = %e, "failed to release thread");
        }
    });

    rx
}

/// Start a run and stream its events using Server-Sent Events
#[utoipa::path(
    post,
    path = "/threads/{thread_id}/runs/stream",
    params(("thread_id" = String, Path, description = "Thread ID")),
    request_body = RunRequest,
    responses(
        (status = 200, description = "Streaming response", content_type = "text/event-stream"),
        (status = 404, description = "Thread not found"),
        (status = 409, description = "Thread is busy")
    ),
    tag = "runs"
)]
pub async fn stream_run(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<String>,
    Json(req): Json<RunRequest>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let events = start_run(&state, &thread_id, &req).await?;

    let mut mapper = RunEventMapper::new(StreamMode::from_request(req.stream_mode.as_ref()));
    let sse_stream = ReceiverStream::new(events)
        .flat_map(move |event| stream::iter(mapper.map(event).into_iter().map(Ok::<Event, Infallible>)));

    Ok(Sse::new(sse_stream).keep_alive(KeepAlive::default()))
}

/// Start a run and wait for its final values
#[utoipa::path(
    post,
    path = "/threads/{thread_id}/runs/wait",
    params(("thread_id" = String, Path, description = "Thread ID")),
    request_body = RunRequest,
    responses(
        (status = 200, description = "Final thread values"),
        (status = 404, description = "Thread not found"),
        (status = 409, description = "Thread is busy"),
        (status = 500, description = "Run failed")
    ),
    tag = "runs"
)]
pub async fn wait_run(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<String>,
    Json(req): Json<RunRequest>,
) -> ApiResult<Json<Value>> {
    let mut events = start_run(&state, &thread_id, &req).await?;

    let mut values = None;
    let mut error = None;
    while let Some(event) = events.recv().await {
        match event {
            StreamEvent::Values { state } => values = Some(wire::state_values(&state)),
            StreamEvent::Error { message, .. } => error = Some(message),
            _ => {}
        }
    }

    if let Some(message) = error {
        return Err(ApiError::Graph(anyhow::anyhow!(message)));
    }

    match values {
        Some(values) => Ok(Json(values)),
        None => {
            let thread = load_thread(&state, &thread_id).await?;
            Ok(Json(
                thread.values.as_ref().map(wire::state_values).unwrap_or_else(|| json!({})),
            ))
        }
    }
}
