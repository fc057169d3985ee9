use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use planner_persist::PersistError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Thread not found: {0}")]
    ThreadNotFound(String),

    #[error("Assistant not found: {0}")]
    AssistantNotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Persistence error: {0}")]
    Persist(#[from] PersistError),

    #[error("Graph execution error: {0}")]
    Graph(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::ThreadNotFound(_)
            | Self::AssistantNotFound(_)
            | Self::Persist(PersistError::ThreadNotFound(_)) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Persist(PersistError::ThreadBusy(_) | PersistError::ThreadExists(_)) => StatusCode::CONFLICT,
            Self::Persist(_) | Self::Graph(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text returned to the client. Internal failures are logged in full
    /// and answered with a generic message.
    fn public_message(&self) -> String {
        match self {
            Self::Persist(e) if self.status().is_server_error() => {
                tracing::error!(error = %e, "persistence failure");
                "Storage error".to_string()
            }
            Self::Graph(e) => {
                tracing::error!(error = %format!("{:#}", e), "run failure");
                "Processing error".to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (ApiError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (ApiError::ThreadNotFound("t".into()), StatusCode::NOT_FOUND),
            (ApiError::Persist(PersistError::ThreadBusy("t".into())), StatusCode::CONFLICT),
            (ApiError::Persist(PersistError::ThreadNotFound("t".into())), StatusCode::NOT_FOUND),
            (ApiError::Persist(PersistError::Internal("boom".into())), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }
}
