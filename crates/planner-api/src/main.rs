use std::sync::Arc;

use anyhow::Context;
use planner_api::{
    bootstrap::{build_graph, build_persistence, init_logging},
    build_router, AppState, Config,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::load().context("Failed to load configuration")?;
    init_logging(&config);

    // Threads live in memory; a restart forgets every conversation
    let persist = build_persistence(&config);
    let graph = build_graph(&config, persist.clone())?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!(
        model = %config.planner.model,
        max_loops = config.planner.max_loops,
        "planner graph ready"
    );

    let state = Arc::new(AppState::new(config, persist, graph));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!(%addr, docs = %format!("http://{}/api/docs", addr), "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested, draining connections");
}
