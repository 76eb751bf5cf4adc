use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ControlPlaneError {
    #[error("not found")]
    NotFound,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("node agent call failed: {0}")]
    NodeAgent(#[from] reqwest::Error),

    #[error("insufficient credits")]
    InsufficientCredits,

    #[error("invalid webhook token")]
    InvalidWebhookToken,
}

impl IntoResponse for ControlPlaneError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ControlPlaneError::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            ControlPlaneError::InsufficientCredits | ControlPlaneError::InvalidWebhookToken => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            _ => {
                tracing::error!(error = %self, "control plane request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
