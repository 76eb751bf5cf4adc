use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::state::Protocol;

/// Where the deployed proxy sidecar should send its wake signal, and what
/// token it must present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub webhook_url: String,
    pub webhook_token: String,
}

/// Body of `POST /deploy` against a node agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployRequest {
    pub server_id: i64,
    pub image: String,
    pub internal_port: u16,
    pub protocol: Protocol,
    pub env_vars: HashMap<String, String>,
    pub min_ram_mb: u32,
    pub min_cpu: f64,
    pub webhook: WebhookConfig,
}

/// Response of `POST /deploy`: the bundle the node agent created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployResponse {
    pub proxy_container_id: String,
    pub game_container_id: String,
    pub network_name: String,
    pub public_port: u16,
}

/// Generic success acknowledgement for wake/hibernate/delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Response of `GET /servers/{id}/stats`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub running: bool,
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub memory_used_mb: f64,
}

/// Response of `GET /servers/{id}/logs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsResponse {
    pub logs: String,
}
