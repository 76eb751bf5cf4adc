use serde::{Deserialize, Serialize};

/// Transport a server's proxy sidecar relays. The proxy is otherwise blind to
/// the payload; this only selects which socket kind it listens on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
}

/// Lifecycle state of a server bundle. Transitions are owned by the lifecycle
/// controller and the orchestrator; nothing else writes this field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ServerState {
    Running,
    Sleeping,
    Starting,
    Stopping,
}
