use axum::{
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    config::Config,
    middleware::logging,
    routes::{assistants, health, runs, threads},
    state::AppState,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::ok,
        health::health_check,
        health::info,
        assistants::search_assistants,
        assistants::get_assistant,
        threads::create_thread,
        threads::search_threads,
        threads::get_thread,
        threads::delete_thread,
        threads::get_thread_state,
        threads::get_thread_history,
        runs::stream_run,
        runs::wait_run,
    ),
    components(schemas(
        health::HealthResponse,
        assistants::AssistantResponse,
        assistants::SearchAssistantsRequest,
        threads::CreateThreadRequest,
        threads::ThreadResponse,
        threads::SearchThreadsRequest,
        threads::HistoryRequest,
        threads::ThreadStateResponse,
        runs::RunRequest,
    )),
    tags(
        (name = "health", description = "Liveness and server info"),
        (name = "assistants", description = "The marketing planner assistant"),
        (name = "threads", description = "Conversation threads and their checkpoints"),
        (name = "runs", description = "Graph runs on a thread")
    )
)]
pub struct ApiDoc;

/// `/runs/wait` only answers once the graph finishes
const REQUEST_TIMEOUT: Duration = Duration::from_secs(900);

pub fn build_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Health
        .route("/ok", get(health::ok))
        .route("/health", get(health::health_check))
        .route("/info", get(health::info))
        // Assistants
        .route("/assistants/search", post(assistants::search_assistants))
        .route("/assistants/:assistant_id", get(assistants::get_assistant))
        // Threads
        .route("/threads", post(threads::create_thread))
        .route("/threads/search", post(threads::search_threads))
        .route(
            "/threads/:thread_id",
            get(threads::get_thread).delete(threads::delete_thread),
        )
        .route("/threads/:thread_id/state", get(threads::get_thread_state))
        .route("/threads/:thread_id/history", post(threads::get_thread_history))
        // Runs
        .route("/threads/:thread_id/runs/stream", post(runs::stream_run))
        .route("/threads/:thread_id/runs/wait", post(runs::wait_run));

    Router::new()
        .merge(api_routes)
        .merge(SwaggerUi::new("/api/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(middleware::from_fn(logging::log_request))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(CompressionLayer::new())
        .layer(build_cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub fn build_cors_layer(config: &Config) -> CorsLayer {
    if config.cors.enabled {
        let cors = CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers(Any);

        if config.cors.origins.iter().any(|o| o == "*") {
            cors.allow_origin(Any)
        } else {
            let parsed_origins: Vec<HeaderValue> = config
                .cors
                .origins
                .iter()
                .filter_map(|o| o.parse::<HeaderValue>().ok())
                .collect();

            cors.allow_origin(parsed_origins)
        }
    } else {
        CorsLayer::permissive()
    }
}
