use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use protocol::NODE_SECRET_HEADER;

use crate::error::ApiError;
use crate::state::AppState;

pub async fn require_node_secret(
    State(state): State<AppState>,
    request: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let presented = request
        .headers()
        .get(NODE_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if presented.as_bytes() != state.node_secret.as_bytes() {
        return Err(ApiError::Unauthorized);
    }

    Ok(next.run(request).await)
}
