use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use std::time::Instant;

/// Liveness probes hit these often; they are logged at debug
const PROBE_PATHS: &[&str] = &["/ok", "/health"];

/// Log one line per request, keyed by the route template so that thread
/// ids do not explode log cardinality. Streaming responses are logged when
/// headers are sent, not when the stream ends.
pub async fn log_request(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let start = Instant::now();

    let response = next.run(req).await;
    let status = response.status();
    let duration_ms = start.elapsed().as_millis() as u64;

    if status.is_server_error() {
        tracing::warn!(%method, %route, %status, duration_ms, "request failed");
    } else if PROBE_PATHS.contains(&route.as_str()) {
        tracing::debug!(%method, %route, %status, duration_ms, "probe");
    } else {
        tracing::info!(%method, %route, %status, duration_ms, "request processed");
    }

    response
}
