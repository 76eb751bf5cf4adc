use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use orchestrator_core::OrchestratorError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid node secret")]
    Unauthorized,

    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Unauthorized => (StatusCode::FORBIDDEN, self.to_string()),
            ApiError::Orchestrator(OrchestratorError::AlreadyDeployed(_)) => {
                (StatusCode::CONFLICT, self.to_string())
            }
            ApiError::Orchestrator(OrchestratorError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, self.to_string())
            }
            ApiError::Orchestrator(_) => {
                tracing::error!(error = %self, "orchestrator call failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
