use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use protocol::WakeWebhookRequest;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/webhook/wake", post(wake))
        .with_state(state)
}

async fn wake(State(state): State<AppState>, Json(req): Json<WakeWebhookRequest>) -> StatusCode {
    match state.lifecycle.wake_on_webhook(req.server_id, &req.token).await {
        Ok(true) => StatusCode::OK,
        Ok(false) => StatusCode::BAD_REQUEST,
        Err(err) => {
            tracing::error!(%err, server_id = req.server_id, "wake webhook failed");
            StatusCode::BAD_REQUEST
        }
    }
}
