use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

/// The server hosts a single graph; its id doubles as the assistant id
pub const GRAPH_ID: &str = "agent";
pub const ASSISTANT_ID: &str = "agent";
pub const ASSISTANT_NAME: &str = "MarketingMediaPlanner";

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AssistantResponse {
    pub assistant_id: String,
    pub graph_id: String,
    pub name: String,
    #[schema(value_type = Object)]
    pub config: Value,
    #[schema(value_type = Object)]
    pub metadata: Value,
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct SearchAssistantsRequest {
    pub graph_id: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

pub fn assistant(state: &AppState) -> AssistantResponse {
    AssistantResponse {
        assistant_id: ASSISTANT_ID.to_string(),
        graph_id: GRAPH_ID.to_string(),
        name: ASSISTANT_NAME.to_string(),
        config: json!({ "configurable": state.config.planner.run_config() }),
        metadata: json!({ "created_by": "system" }),
        version: 1,
        created_at: state.started_at,
        updated_at: state.started_at,
    }
}

/// Accepts the assistant id or the graph id, which coincide here
pub fn ensure_assistant(assistant_id: &str) -> ApiResult<()> {
    if assistant_id == ASSISTANT_ID || assistant_id == GRAPH_ID {
        Ok(())
    } else {
        Err(ApiError::AssistantNotFound(assistant_id.to_string()))
    }
}

/// Search assistants
#[utoipa::path(
    post,
    path = "/assistants/search",
    request_body = SearchAssistantsRequest,
    responses(
        (status = 200, description = "Matching assistants", body = [AssistantResponse])
    ),
    tag = "assistants"
)]
pub async fn search_assistants(
    State(state): State<Arc<AppState>>,
    body: Option<Json<SearchAssistantsRequest>>,
) -> ApiResult<Json<Vec<AssistantResponse>>> {
    let req = body.map(|Json(req)| req).unwrap_or_default();

    let matches = req.graph_id.as_deref().map_or(true, |id| id == GRAPH_ID);
    let skip = req.offset.unwrap_or(0);
    let found: Vec<AssistantResponse> = std::iter::once(assistant(&state))
        .filter(|_| matches)
        .skip(skip)
        .take(req.limit.unwrap_or(10))
        .collect();

    Ok(Json(found))
}

/// Get an assistant by id
#[utoipa::path(
    get,
    path = "/assistants/{assistant_id}",
    params(("assistant_id" = String, Path, description = "Assistant or graph id")),
    responses(
        (status = 200, description = "Assistant found", body = AssistantResponse),
        (status = 404, description = "Assistant not found")
    ),
    tag = "assistants"
)]
pub async fn get_assistant(
    State(state): State<Arc<AppState>>,
    Path(assistant_id): Path<String>,
) -> ApiResult<Json<AssistantResponse>> {
    ensure_assistant(&assistant_id)?;
    Ok(Json(assistant(&state)))
}
