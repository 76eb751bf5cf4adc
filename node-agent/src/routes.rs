use axum::extract::{Path, Query, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use orchestrator_core::DeploySpec;
use protocol::{DeployRequest, DeployResponse, LogsResponse, StatsResponse, SuccessResponse};
use serde::Deserialize;

use crate::auth::require_node_secret;
use crate::error::ApiError;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/deploy", post(deploy))
        .route("/servers/{id}/wake", post(wake))
        .route("/servers/{id}/hibernate", post(hibernate))
        .route("/servers/{id}", delete(delete_server))
        .route("/servers/{id}/stats", get(stats))
        .route("/servers/{id}/logs", get(logs))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_node_secret,
        ))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn deploy(
    State(state): State<AppState>,
    Json(req): Json<DeployRequest>,
) -> Result<Json<DeployResponse>, ApiError> {
    let spec = DeploySpec {
        server_id: req.server_id,
        proxy_image: "wake-proxy:latest".to_string(),
        game_image: req.image,
        internal_port: req.internal_port,
        protocol: req.protocol,
        env_vars: req.env_vars,
        min_ram_mb: req.min_ram_mb,
        min_cpu: req.min_cpu,
        webhook_url: req.webhook.webhook_url,
        webhook_token: req.webhook.webhook_token,
    };
    let bundle = state.orchestrator.deploy(&spec).await?;
    Ok(Json(DeployResponse {
        proxy_container_id: bundle.proxy_container_id,
        game_container_id: bundle.game_container_id,
        network_name: bundle.network_name,
        public_port: bundle.public_port,
    }))
}

async fn wake(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state.orchestrator.wake(id).await?;
    Ok(Json(SuccessResponse { success: true }))
}

async fn hibernate(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state.orchestrator.hibernate(id).await?;
    Ok(Json(SuccessResponse { success: true }))
}

#[derive(Deserialize)]
struct DeleteParams {
    public_port: Option<u16>,
}

async fn delete_server(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<DeleteParams>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state.orchestrator.delete(id, params.public_port).await?;
    Ok(Json(SuccessResponse { success: true }))
}

async fn stats(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<StatsResponse>, ApiError> {
    let stats = state.orchestrator.stats(id).await?;
    Ok(Json(StatsResponse {
        running: stats.running,
        cpu_percent: stats.cpu_percent,
        memory_percent: stats.memory_percent,
        memory_used_mb: stats.memory_used_mb,
    }))
}

#[derive(Deserialize)]
struct LogsParams {
    #[serde(default = "default_tail")]
    tail: u32,
}

fn default_tail() -> u32 {
    100
}

async fn logs(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<LogsParams>,
) -> Result<Json<LogsResponse>, ApiError> {
    let logs = state.orchestrator.logs(id, params.tail).await?;
    Ok(Json(LogsResponse { logs }))
}
