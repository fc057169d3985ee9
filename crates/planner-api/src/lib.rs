//! Development server for the marketing planner graph.
//!
//! Speaks the subset of the LangGraph server API that hosted chat clients
//! use: assistants, threads, thread state/history and streamed runs.

pub mod app;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod sse;
pub mod state;
pub mod wire;

pub use app::build_router;
pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use state::AppState;
