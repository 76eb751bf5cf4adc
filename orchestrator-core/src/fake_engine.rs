use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::engine::{ContainerEngine, ContainerSpec, RawStats};
use crate::error::OrchestratorError;

#[derive(Default)]
struct State {
    images: HashSet<String>,
    networks: HashSet<String>,
    volumes: HashSet<String>,
    containers: HashSet<String>,
    running: HashSet<String>,
}

/// In-memory stand-in for a container runtime. Backs the orchestrator's own
/// idempotence/leak-freedom tests and the node agent's integration tests, so
/// neither needs a live Docker daemon.
#[derive(Default)]
pub struct FakeEngine {
    state: Mutex<State>,
}

impl FakeEngine {
    pub fn new() -> Self {
        FakeEngine::default()
    }

    pub fn container_count(&self) -> usize {
        self.state.lock().unwrap().containers.len()
    }

    pub fn network_count(&self) -> usize {
        self.state.lock().unwrap().networks.len()
    }

    pub fn volume_count(&self) -> usize {
        self.state.lock().unwrap().volumes.len()
    }

    pub fn has_image(&self, tag: &str) -> bool {
        self.state.lock().unwrap().images.contains(tag)
    }
}

#[async_trait]
impl ContainerEngine for FakeEngine {
    async fn ensure_image(&self, tag: &str, _build_context: &Path) -> Result<(), OrchestratorError> {
        self.state.lock().unwrap().images.insert(tag.to_string());
        Ok(())
    }

    async fn ensure_network(&self, name: &str) -> Result<(), OrchestratorError> {
        self.state.lock().unwrap().networks.insert(name.to_string());
        Ok(())
    }

    async fn remove_network(&self, name: &str) -> Result<(), OrchestratorError> {
        self.state.lock().unwrap().networks.remove(name);
        Ok(())
    }

    async fn ensure_volume(&self, name: &str) -> Result<(), OrchestratorError> {
        self.state.lock().unwrap().volumes.insert(name.to_string());
        Ok(())
    }

    async fn remove_volume(&self, name: &str) -> Result<(), OrchestratorError> {
        self.state.lock().unwrap().volumes.remove(name);
        Ok(())
    }

    async fn container_exists(&self, name: &str) -> Result<bool, OrchestratorError> {
        Ok(self.state.lock().unwrap().containers.contains(name))
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, OrchestratorError> {
        let mut state = self.state.lock().unwrap();
        if state.containers.contains(&spec.name) {
            return Err(OrchestratorError::AlreadyDeployed(0));
        }
        state.containers.insert(spec.name.clone());
        Ok(format!("fake-{}", spec.name))
    }

    async fn start_container(&self, name: &str) -> Result<(), OrchestratorError> {
        let mut state = self.state.lock().unwrap();
        if !state.containers.contains(name) {
            return Err(OrchestratorError::NotFound(name.to_string()));
        }
        state.running.insert(name.to_string());
        Ok(())
    }

    async fn stop_container(&self, name: &str, _timeout_secs: i64) -> Result<(), OrchestratorError> {
        self.state.lock().unwrap().running.remove(name);
        Ok(())
    }

    async fn remove_container(&self, name: &str, _force: bool) -> Result<(), OrchestratorError> {
        let mut state = self.state.lock().unwrap();
        state.containers.remove(name);
        state.running.remove(name);
        Ok(())
    }

    async fn is_running(&self, name: &str) -> Result<bool, OrchestratorError> {
        Ok(self.state.lock().unwrap().running.contains(name))
    }

    async fn stats(&self, name: &str) -> Result<RawStats, OrchestratorError> {
        let running = self.state.lock().unwrap().running.contains(name);
        Ok(RawStats {
            running,
            cpu_total_usage: 100,
            precpu_total_usage: 50,
            system_cpu_usage: 10_000,
            presystem_cpu_usage: 9_000,
            memory_usage: 64 * 1024 * 1024,
            memory_limit: 512 * 1024 * 1024,
        })
    }

    async fn logs(&self, name: &str, _tail: u32) -> Result<String, OrchestratorError> {
        if !self.state.lock().unwrap().containers.contains(name) {
            return Err(OrchestratorError::NotFound(name.to_string()));
        }
        Ok(String::new())
    }
}
