use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use planner_graph::NodeType;
use planner_persist::{Checkpoint, PersistError, Thread, ThreadSearch, ThreadStatus};
use planner_types::PlannerState;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
    wire,
};

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct CreateThreadRequest {
    pub thread_id: Option<String>,
    #[schema(value_type = Object)]
    pub metadata: Map<String, Value>,
    /// "raise" (default) or "do_nothing" to return the existing thread
    pub if_exists: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ThreadResponse {
    pub thread_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[schema(value_type = Object)]
    pub metadata: Map<String, Value>,
    pub status: String,
    #[schema(value_type = Option<Object>)]
    pub values: Option<Value>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct SearchThreadsRequest {
    #[schema(value_type = Object)]
    pub metadata: Map<String, Value>,
    pub status: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct HistoryRequest {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ThreadStateResponse {
    #[schema(value_type = Object)]
    pub values: Value,
    /// Node the thread resumes at; empty when the last run finished
    pub next: Vec<String>,
    #[schema(value_type = Object)]
    pub checkpoint: Value,
    #[schema(value_type = Object)]
    pub metadata: Value,
    pub created_at: Option<DateTime<Utc>>,
}

fn status_name(status: ThreadStatus) -> String {
    match status {
        ThreadStatus::Idle => "idle",
        ThreadStatus::Busy => "busy",
        ThreadStatus::Interrupted => "interrupted",
        ThreadStatus::Error => "error",
    }
    .to_string()
}

fn parse_status(name: &str) -> ApiResult<ThreadStatus> {
    match name {
        "idle" => Ok(ThreadStatus::Idle),
        "busy" => Ok(ThreadStatus::Busy),
        "interrupted" => Ok(ThreadStatus::Interrupted),
        "error" => Ok(ThreadStatus::Error),
        other => Err(ApiError::BadRequest(format!("unknown thread status: {}", other))),
    }
}

fn thread_to_response(thread: Thread) -> ThreadResponse {
    ThreadResponse {
        thread_id: thread.thread_id,
        created_at: thread.created_at,
        updated_at: thread.updated_at,
        metadata: thread.metadata,
        status: status_name(thread.status),
        values: thread.values.as_ref().map(wire::state_values),
    }
}

fn next_nodes(values: Option<&PlannerState>) -> Vec<String> {
    match values {
        Some(state) if state.awaiting_user_input => vec![NodeType::ProcessUserInput.to_string()],
        _ => Vec::new(),
    }
}

fn checkpoint_to_state(checkpoint: &Checkpoint, step: usize) -> ThreadStateResponse {
    ThreadStateResponse {
        values: wire::state_values(&checkpoint.values),
        next: next_nodes(Some(&checkpoint.values)),
        checkpoint: json!({
            "thread_id": checkpoint.thread_id,
            "checkpoint_id": checkpoint.checkpoint_id,
        }),
        metadata: json!({
            "source": "loop",
            "step": step,
            "run_id": checkpoint.run_id,
            "writes": { checkpoint.node.clone(): Value::Null },
        }),
        created_at: Some(checkpoint.created_at),
    }
}

pub(crate) async fn load_thread(state: &AppState, thread_id: &str) -> ApiResult<Thread> {
    state
        .persist
        .get_thread(thread_id)
        .await?
        .ok_or_else(|| ApiError::ThreadNotFound(thread_id.to_string()))
}

/// Create a new thread
#[utoipa::path(
    post,
    path = "/threads",
    request_body = CreateThreadRequest,
    responses(
        (status = 200, description = "Thread created", body = ThreadResponse),
        (status = 409, description = "Thread already exists")
    ),
    tag = "threads"
)]
pub async fn create_thread(
    State(state): State<Arc<AppState>>,
    body: Option<Json<CreateThreadRequest>>,
) -> ApiResult<Json<ThreadResponse>> {
    let req = body.map(|Json(req)| req).unwrap_or_default();

    let thread = match state.persist.create_thread(req.thread_id.clone(), req.metadata).await {
        Ok(thread) => thread,
        Err(PersistError::ThreadExists(id)) if req.if_exists.as_deref() == Some("do_nothing") => {
            load_thread(&state, &id).await?
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(thread_id = %thread.thread_id, "thread created");
    Ok(Json(thread_to_response(thread)))
}

/// Search threads by metadata and status
#[utoipa::path(
    post,
    path = "/threads/search",
    request_body = SearchThreadsRequest,
    responses(
        (status = 200, description = "Matching threads, most recent first", body = [ThreadResponse]),
        (status = 400, description = "Invalid request")
    ),
    tag = "threads"
)]
pub async fn search_threads(
    State(state): State<Arc<AppState>>,
    body: Option<Json<SearchThreadsRequest>>,
) -> ApiResult<Json<Vec<ThreadResponse>>> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let defaults = ThreadSearch::default();

    let query = ThreadSearch {
        metadata: req.metadata,
        status: req.status.as_deref().map(parse_status).transpose()?,
        limit: req.limit.unwrap_or(defaults.limit).min(100),
        offset: req.offset.unwrap_or(defaults.offset),
    };

    let threads = state.persist.search_threads(query).await?;
    Ok(Json(threads.into_iter().map(thread_to_response).collect()))
}

/// Get a specific thread by ID
#[utoipa::path(
    get,
    path = "/threads/{thread_id}",
    params(("thread_id" = String, Path, description = "Thread ID")),
    responses(
        (status = 200, description = "Thread found", body = ThreadResponse),
        (status = 404, description = "Thread not found")
    ),
    tag = "threads"
)]
pub async fn get_thread(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<String>,
) -> ApiResult<Json<ThreadResponse>> {
    let thread = load_thread(&state, &thread_id).await?;
    Ok(Json(thread_to_response(thread)))
}

/// Delete a thread and its checkpoints
#[utoipa::path(
    delete,
    path = "/threads/{thread_id}",
    params(("thread_id" = String, Path, description = "Thread ID")),
    responses(
        (status = 204, description = "Thread deleted"),
        (status = 404, description = "Thread not found")
    ),
    tag = "threads"
)]
pub async fn delete_thread(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<String>,
) -> ApiResult<StatusCode> {
    state.persist.delete_thread(&thread_id).await?;
    tracing::info!(thread_id = %thread_id, "thread deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Current values of a thread
#[utoipa::path(
    get,
    path = "/threads/{thread_id}/state",
    params(("thread_id" = String, Path, description = "Thread ID")),
    responses(
        (status = 200, description = "Thread state", body = ThreadStateResponse),
        (status = 404, description = "Thread not found")
    ),
    tag = "threads"
)]
pub async fn get_thread_state(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<String>,
) -> ApiResult<Json<ThreadStateResponse>> {
    let thread = load_thread(&state, &thread_id).await?;
    let history = state.persist.get_history(&thread_id, None).await?;

    let response = match history.first() {
        Some(checkpoint) => checkpoint_to_state(checkpoint, history.len()),
        None => ThreadStateResponse {
            values: thread.values.as_ref().map(wire::state_values).unwrap_or_else(|| json!({})),
            next: next_nodes(thread.values.as_ref()),
            checkpoint: json!({ "thread_id": thread.thread_id, "checkpoint_id": Value::Null }),
            metadata: json!({}),
            created_at: None,
        },
    };

    Ok(Json(response))
}

/// Checkpoints of a thread, newest first
#[utoipa::path(
    post,
    path = "/threads/{thread_id}/history",
    params(("thread_id" = String, Path, description = "Thread ID")),
    request_body = HistoryRequest,
    responses(
        (status = 200, description = "Thread history", body = [ThreadStateResponse]),
        (status = 404, description = "Thread not found")
    ),
    tag = "threads"
)]
pub async fn get_thread_history(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<String>,
    body: Option<Json<HistoryRequest>>,
) -> ApiResult<Json<Vec<ThreadStateResponse>>> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let checkpoints = state.persist.get_history(&thread_id, req.limit.or(Some(10))).await?;

    let total = checkpoints.len();
    let states = checkpoints
        .iter()
        .enumerate()
        .map(|(idx, checkpoint)| checkpoint_to_state(checkpoint, total - idx))
        .collect();

    Ok(Json(states))
}
