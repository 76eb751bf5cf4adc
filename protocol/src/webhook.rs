use serde::{Deserialize, Serialize};

/// Body posted by a proxy sidecar to the control plane's wake webhook when it
/// observes its target unreachable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WakeWebhookRequest {
    pub server_id: i64,
    pub token: String,
}
