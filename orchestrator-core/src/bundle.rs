use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use protocol::Protocol;
use tracing::{info, warn};

use crate::engine::{ContainerEngine, ContainerSpec};
use crate::error::OrchestratorError;
use crate::naming::ResourceNames;
use crate::ports::PortAllocator;

/// Everything a `deploy` call needs to stand up one server's bundle.
#[derive(Debug, Clone)]
pub struct DeploySpec {
    pub server_id: i64,
    /// Image reference for the proxy sidecar. Built once and reused across
    /// every bundle; the orchestrator does not rebuild it per deploy.
    pub proxy_image: String,
    pub game_image: String,
    pub internal_port: u16,
    pub protocol: Protocol,
    pub env_vars: HashMap<String, String>,
    pub min_ram_mb: u32,
    pub min_cpu: f64,
    pub webhook_url: String,
    pub webhook_token: String,
}

/// The resource bundle a successful `deploy` produces.
#[derive(Debug, Clone)]
pub struct BundleDescriptor {
    pub proxy_container_id: String,
    pub game_container_id: String,
    pub network_name: String,
    pub public_port: u16,
}

/// A point-in-time resource usage sample, ready for the lifecycle
/// controller's idle check.
#[derive(Debug, Clone, Copy)]
pub struct ContainerStats {
    pub running: bool,
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub memory_used_mb: f64,
}

const PROXY_MEM_LIMIT_BYTES: i64 = 50 * 1024 * 1024;
const PROXY_CPU_QUOTA: f64 = 0.5;
const STOP_TIMEOUT_SECS: i64 = 30;

/// Deploy/wake/hibernate/delete/stats/logs over one server's bundle. Holds
/// no per-server state itself beyond the port allocator; the database of
/// record lives in the control plane.
pub struct Orchestrator {
    engine: Arc<dyn ContainerEngine>,
    ports: Arc<PortAllocator>,
    /// Directory holding the proxy sidecar's Dockerfile, built once and
    /// reused by tag across every deploy on this node.
    proxy_build_context: PathBuf,
}

impl Orchestrator {
    pub fn new(
        engine: Arc<dyn ContainerEngine>,
        ports: Arc<PortAllocator>,
        proxy_build_context: PathBuf,
    ) -> Self {
        Orchestrator {
            engine,
            ports,
            proxy_build_context,
        }
    }

    pub async fn deploy(&self, spec: &DeploySpec) -> Result<BundleDescriptor, OrchestratorError> {
        self.engine
            .ensure_image(&spec.proxy_image, &self.proxy_build_context)
            .await?;

        let names = ResourceNames::new(spec.server_id);

        if self.engine.container_exists(&names.game_container()).await?
            || self.engine.container_exists(&names.proxy_container()).await?
        {
            return Err(OrchestratorError::AlreadyDeployed(spec.server_id));
        }

        self.engine.ensure_network(&names.network()).await?;
        self.engine.ensure_volume(&names.volume()).await?;

        let public_port = self.ports.reserve()?;

        let proto = match spec.protocol {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        };

        let mut proxy_env = HashMap::new();
        proxy_env.insert("TARGET_HOST".to_string(), names.game_container());
        proxy_env.insert("TARGET_PORT".to_string(), spec.internal_port.to_string());
        proxy_env.insert("LISTEN_PORT".to_string(), spec.internal_port.to_string());
        proxy_env.insert(
            "PROTOCOL".to_string(),
            proto.to_ascii_uppercase(),
        );
        proxy_env.insert("BACKEND_WEBHOOK_URL".to_string(), spec.webhook_url.clone());
        proxy_env.insert("SERVER_ID".to_string(), spec.server_id.to_string());
        proxy_env.insert("WEBHOOK_TOKEN".to_string(), spec.webhook_token.clone());

        let proxy_spec = ContainerSpec {
            name: names.proxy_container(),
            image: spec.proxy_image.clone(),
            network: names.network(),
            env: proxy_env,
            mounts: vec![],
            port_bindings: vec![(spec.internal_port, proto, public_port)],
            mem_limit_bytes: PROXY_MEM_LIMIT_BYTES,
            cpu_quota: PROXY_CPU_QUOTA,
        };

        let proxy_container_id = match self.engine.create_container(&proxy_spec).await {
            Ok(id) => id,
            Err(err) => {
                self.ports.release(public_port);
                return Err(err);
            }
        };
        self.engine.start_container(&names.proxy_container()).await?;

        let mut game_env = spec.env_vars.clone();
        game_env.insert("SERVER_ID".to_string(), spec.server_id.to_string());
        game_env.insert("DATA_DIR".to_string(), "/data".to_string());

        let game_spec = ContainerSpec {
            name: names.game_container(),
            image: spec.game_image.clone(),
            network: names.network(),
            env: game_env,
            mounts: vec![(names.volume(), "/data".to_string())],
            port_bindings: vec![],
            mem_limit_bytes: spec.min_ram_mb as i64 * 1024 * 1024,
            cpu_quota: spec.min_cpu,
        };
        let game_container_id = self.engine.create_container(&game_spec).await?;

        info!(server_id = spec.server_id, public_port, "deployed server bundle");

        Ok(BundleDescriptor {
            proxy_container_id,
            game_container_id,
            network_name: names.network(),
            public_port,
        })
    }

    pub async fn wake(&self, server_id: i64) -> Result<(), OrchestratorError> {
        let names = ResourceNames::new(server_id);
        self.engine.start_container(&names.game_container()).await
    }

    pub async fn hibernate(&self, server_id: i64) -> Result<(), OrchestratorError> {
        let names = ResourceNames::new(server_id);
        self.engine
            .stop_container(&names.game_container(), STOP_TIMEOUT_SECS)
            .await
    }

    /// Tears down every resource belonging to a server. Attempts all four
    /// removals even if an earlier one fails, and only then reports the
    /// collected errors — a caller can safely re-invoke delete to finish the
    /// job.
    pub async fn delete(&self, server_id: i64, public_port: Option<u16>) -> Result<(), OrchestratorError> {
        let names = ResourceNames::new(server_id);
        let mut errors = Vec::new();

        if let Err(err) = self.engine.remove_container(&names.game_container(), true).await {
            warn!(server_id, %err, "failed removing game container");
            errors.push(err.to_string());
        }
        if let Err(err) = self.engine.remove_container(&names.proxy_container(), true).await {
            warn!(server_id, %err, "failed removing proxy container");
            errors.push(err.to_string());
        }
        if let Err(err) = self.engine.remove_network(&names.network()).await {
            warn!(server_id, %err, "failed removing network");
            errors.push(err.to_string());
        }
        if let Err(err) = self.engine.remove_volume(&names.volume()).await {
            warn!(server_id, %err, "failed removing volume");
            errors.push(err.to_string());
        }
        if let Some(port) = public_port {
            self.ports.release(port);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(OrchestratorError::PartialDelete { server_id, errors })
        }
    }

    pub async fn stats(&self, server_id: i64) -> Result<ContainerStats, OrchestratorError> {
        let names = ResourceNames::new(server_id);
        let raw = self.engine.stats(&names.game_container()).await?;

        let cpu_delta = raw.cpu_total_usage.saturating_sub(raw.precpu_total_usage) as f64;
        let system_delta = raw.system_cpu_usage.saturating_sub(raw.presystem_cpu_usage) as f64;
        let cpu_percent = if system_delta > 0.0 {
            (cpu_delta / system_delta) * 100.0
        } else {
            0.0
        };
        let memory_percent = if raw.memory_limit > 0 {
            raw.memory_usage as f64 / raw.memory_limit as f64 * 100.0
        } else {
            0.0
        };

        Ok(ContainerStats {
            running: raw.running,
            cpu_percent,
            memory_percent,
            memory_used_mb: raw.memory_usage as f64 / (1024.0 * 1024.0),
        })
    }

    pub async fn logs(&self, server_id: i64, tail: u32) -> Result<String, OrchestratorError> {
        let names = ResourceNames::new(server_id);
        self.engine.logs(&names.game_container(), tail).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_engine::FakeEngine;
    use std::collections::HashMap as Map;

    fn spec(server_id: i64) -> DeploySpec {
        DeploySpec {
            server_id,
            proxy_image: "wake-proxy:latest".to_string(),
            game_image: "itzg/minecraft-server".to_string(),
            internal_port: 25565,
            protocol: Protocol::Tcp,
            env_vars: Map::new(),
            min_ram_mb: 1024,
            min_cpu: 1.0,
            webhook_url: "http://control-plane/api/webhook/wake".to_string(),
            webhook_token: "secret".to_string(),
        }
    }

    fn orchestrator() -> (Orchestrator, Arc<FakeEngine>) {
        let engine = Arc::new(FakeEngine::new());
        let orchestrator = Orchestrator::new(
            engine.clone(),
            Arc::new(PortAllocator::new(30000..=30010)),
            PathBuf::from("wake-proxy"),
        );
        (orchestrator, engine)
    }

    #[tokio::test]
    async fn deploy_builds_the_proxy_image_once() {
        let (orchestrator, engine) = orchestrator();
        orchestrator.deploy(&spec(5)).await.unwrap();
        orchestrator.delete(5, None).await.unwrap();
        assert!(engine.has_image("wake-proxy:latest"));
    }

    #[tokio::test]
    async fn deploy_refuses_when_bundle_already_exists() {
        let (orchestrator, _engine) = orchestrator();
        let spec = spec(1);
        orchestrator.deploy(&spec).await.unwrap();
        let err = orchestrator.deploy(&spec).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::AlreadyDeployed(1)));
    }

    #[tokio::test]
    async fn deploy_then_delete_leaves_no_resources() {
        let (orchestrator, engine) = orchestrator();
        let bundle = orchestrator.deploy(&spec(2)).await.unwrap();
        orchestrator.delete(2, Some(bundle.public_port)).await.unwrap();

        assert_eq!(engine.container_count(), 0);
        assert_eq!(engine.network_count(), 0);
        assert_eq!(engine.volume_count(), 0);
    }

    #[tokio::test]
    async fn wake_is_idempotent() {
        let (orchestrator, _engine) = orchestrator();
        orchestrator.deploy(&spec(3)).await.unwrap();
        orchestrator.wake(3).await.unwrap();
        orchestrator.wake(3).await.unwrap();
    }

    #[tokio::test]
    async fn delete_attempts_all_resources_even_if_game_container_is_missing() {
        let (orchestrator, engine) = orchestrator();
        let bundle = orchestrator.deploy(&spec(4)).await.unwrap();
        // simulate the game container already having been reaped out of band
        engine.remove_container("game-4", true).await.unwrap();
        orchestrator.delete(4, Some(bundle.public_port)).await.unwrap();
        assert_eq!(engine.container_count(), 0);
    }
}
