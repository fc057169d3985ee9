use axum::{extract::State, Json};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use utoipa::ToSchema;

use planner_persist::ThreadSearch;

use crate::{error::ApiResult, state::AppState};

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub services: HashMap<String, String>,
}

/// Liveness probe used by LangGraph clients
#[utoipa::path(
    get,
    path = "/ok",
    responses((status = 200, description = "Server is up")),
    tag = "health"
)]
pub async fn ok() -> Json<Value> {
    Json(json!({ "ok": true }))
}

/// Health check endpoint
///
/// Returns the health status of the API and its dependencies
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> ApiResult<Json<HealthResponse>> {
    let mut services = HashMap::new();

    let probe = ThreadSearch {
        limit: 1,
        ..ThreadSearch::default()
    };
    match state.persist.search_threads(probe).await {
        Ok(_) => services.insert("persistence".to_string(), "available".to_string()),
        Err(e) => {
            tracing::warn!(error = %e, "persistence health probe failed");
            services.insert("persistence".to_string(), "unavailable".to_string())
        }
    };

    services.insert("graph".to_string(), crate::routes::assistants::GRAPH_ID.to_string());

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        services,
    }))
}

/// Server capabilities, in the shape LangGraph clients probe for
#[utoipa::path(
    get,
    path = "/info",
    responses((status = 200, description = "Server information")),
    tag = "health"
)]
pub async fn info(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "started_at": state.started_at,
        "graphs": [crate::routes::assistants::GRAPH_ID],
        "flags": {
            "assistants": true,
            "crons": false,
            "langsmith": false,
        },
    }))
}
