//! Wire types shared between the proxy sidecar, the node agent, and the
//! control plane. Kept dependency-light (serde only, plus the small error
//! enum) so every binary in the workspace can depend on it without pulling
//! in an HTTP stack or a database driver.

mod money;
mod rpc;
mod state;
mod webhook;

pub use money::Millicredits;
pub use rpc::{
    DeployRequest, DeployResponse, LogsResponse, StatsResponse, SuccessResponse, WebhookConfig,
};
pub use state::{Protocol, ServerState};
pub use webhook::WakeWebhookRequest;

/// Header carrying the shared secret between the control plane and a node agent.
pub const NODE_SECRET_HEADER: &str = "X-Node-Secret";
