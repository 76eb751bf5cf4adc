use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;

use crate::error::OrchestratorError;

/// Everything needed to create one container, independent of which engine
/// backs it.
#[derive(Debug, Clone)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub network: String,
    pub env: HashMap<String, String>,
    /// `(host_path_or_volume_name, container_path)`.
    pub mounts: Vec<(String, String)>,
    /// `(internal_port, protocol, public_port)`. Empty for containers with no
    /// published ports (the game container itself is never published; only
    /// its proxy sidecar is).
    pub port_bindings: Vec<(u16, &'static str, u16)>,
    pub mem_limit_bytes: i64,
    /// Fraction of a CPU core, e.g. `0.5`.
    pub cpu_quota: f64,
}

/// A single non-streaming resource usage sample, in the raw units Docker's
/// stats API reports them. [`crate::bundle::Orchestrator`] turns this into
/// the percentages callers actually want.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawStats {
    pub running: bool,
    pub cpu_total_usage: u64,
    pub precpu_total_usage: u64,
    pub system_cpu_usage: u64,
    pub presystem_cpu_usage: u64,
    pub memory_usage: u64,
    pub memory_limit: u64,
}

/// Capability seam between the orchestration logic and an actual container
/// runtime. Exists so the reconciler and node agent can be exercised against
/// an in-memory fake without a live daemon.
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Builds `tag` from the Dockerfile at `build_context` if it doesn't
    /// already exist locally. Cheap to call on every deploy: implementations
    /// must check for the tag first and skip the build when it's present.
    async fn ensure_image(&self, tag: &str, build_context: &Path) -> Result<(), OrchestratorError>;

    async fn ensure_network(&self, name: &str) -> Result<(), OrchestratorError>;
    async fn remove_network(&self, name: &str) -> Result<(), OrchestratorError>;

    async fn ensure_volume(&self, name: &str) -> Result<(), OrchestratorError>;
    async fn remove_volume(&self, name: &str) -> Result<(), OrchestratorError>;

    async fn container_exists(&self, name: &str) -> Result<bool, OrchestratorError>;

    /// Creates the container but does not start it.
    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, OrchestratorError>;
    async fn start_container(&self, name: &str) -> Result<(), OrchestratorError>;
    async fn stop_container(&self, name: &str, timeout_secs: i64) -> Result<(), OrchestratorError>;
    async fn remove_container(&self, name: &str, force: bool) -> Result<(), OrchestratorError>;

    async fn is_running(&self, name: &str) -> Result<bool, OrchestratorError>;
    async fn stats(&self, name: &str) -> Result<RawStats, OrchestratorError>;
    async fn logs(&self, name: &str, tail: u32) -> Result<String, OrchestratorError>;
}
