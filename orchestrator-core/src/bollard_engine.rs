use std::collections::HashMap;
use std::path::Path;

use bollard::container::{
    Config, CreateContainerOptions, LogsOptions, RemoveContainerOptions, StatsOptions,
    StopContainerOptions,
};
use bollard::errors::Error as BollardError;
use bollard::image::BuildImageOptions;
use bollard::models::{HostConfig, PortBinding};
use bollard::network::CreateNetworkOptions;
use bollard::volume::CreateVolumeOptions;
use bollard::Docker;
use futures_util::StreamExt;
use tracing::info;

use crate::engine::{ContainerEngine, ContainerSpec, RawStats};
use crate::error::OrchestratorError;

/// Tars up `build_context` (recursively) so it can be streamed to the
/// daemon's build endpoint as the build context body.
fn tar_build_context(tag: &str, build_context: &Path) -> Result<bytes::Bytes, OrchestratorError> {
    let mut builder = tar::Builder::new(Vec::new());
    builder
        .append_dir_all(".", build_context)
        .map_err(|source| OrchestratorError::BuildContext {
            tag: tag.to_string(),
            source,
        })?;
    let bytes = builder
        .into_inner()
        .map_err(|source| OrchestratorError::BuildContext {
            tag: tag.to_string(),
            source,
        })?;
    Ok(bytes.into())
}

/// Drives the local Docker daemon over its HTTP API via `bollard`.
pub struct BollardEngine {
    docker: Docker,
}

impl BollardEngine {
    pub fn connect() -> Result<Self, OrchestratorError> {
        let docker = Docker::connect_with_local_defaults()?;
        Ok(BollardEngine { docker })
    }

    fn is_not_found(err: &BollardError) -> bool {
        matches!(err, BollardError::DockerResponseServerError { status_code, .. } if *status_code == 404)
    }
}

#[async_trait::async_trait]
impl ContainerEngine for BollardEngine {
    async fn ensure_image(&self, tag: &str, build_context: &Path) -> Result<(), OrchestratorError> {
        if self.docker.inspect_image(tag).await.is_ok() {
            return Ok(());
        }
        info!(tag, path = %build_context.display(), "building image");

        let context_body = tar_build_context(tag, build_context)?;
        let options = BuildImageOptions {
            t: tag.to_string(),
            rm: true,
            forcerm: true,
            ..Default::default()
        };

        let mut stream = self.docker.build_image(options, None, Some(context_body));
        while let Some(progress) = stream.next().await {
            progress?;
        }
        info!(tag, "image built");
        Ok(())
    }

    async fn ensure_network(&self, name: &str) -> Result<(), OrchestratorError> {
        if self.docker.inspect_network::<String>(name, None).await.is_ok() {
            return Ok(());
        }
        self.docker
            .create_network(CreateNetworkOptions {
                name: name.to_string(),
                driver: "bridge".to_string(),
                ..Default::default()
            })
            .await?;
        Ok(())
    }

    async fn remove_network(&self, name: &str) -> Result<(), OrchestratorError> {
        match self.docker.remove_network(name).await {
            Ok(()) => Ok(()),
            Err(err) if Self::is_not_found(&err) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    async fn ensure_volume(&self, name: &str) -> Result<(), OrchestratorError> {
        if self.docker.inspect_volume(name).await.is_ok() {
            return Ok(());
        }
        self.docker
            .create_volume(CreateVolumeOptions {
                name: name.to_string(),
                ..Default::default()
            })
            .await?;
        Ok(())
    }

    async fn remove_volume(&self, name: &str) -> Result<(), OrchestratorError> {
        match self.docker.remove_volume(name, None).await {
            Ok(()) => Ok(()),
            Err(err) if Self::is_not_found(&err) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    async fn container_exists(&self, name: &str) -> Result<bool, OrchestratorError> {
        match self.docker.inspect_container(name, None).await {
            Ok(_) => Ok(true),
            Err(err) if Self::is_not_found(&err) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, OrchestratorError> {
        let env: Vec<String> = spec
            .env
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();

        let binds = spec
            .mounts
            .iter()
            .map(|(src, dst)| format!("{src}:{dst}"))
            .collect::<Vec<_>>();

        let mut port_bindings: HashMap<String, Option<Vec<PortBinding>>> = HashMap::new();
        let mut exposed_ports: HashMap<String, HashMap<(), ()>> = HashMap::new();
        for (internal, proto, public) in &spec.port_bindings {
            let key = format!("{internal}/{proto}");
            exposed_ports.insert(key.clone(), HashMap::new());
            port_bindings.insert(
                key,
                Some(vec![PortBinding {
                    host_ip: Some("0.0.0.0".to_string()),
                    host_port: Some(public.to_string()),
                }]),
            );
        }

        let host_config = HostConfig {
            network_mode: Some(spec.network.clone()),
            binds: if binds.is_empty() { None } else { Some(binds) },
            port_bindings: if spec.port_bindings.is_empty() {
                None
            } else {
                Some(port_bindings)
            },
            memory: Some(spec.mem_limit_bytes),
            nano_cpus: Some((spec.cpu_quota * 1_000_000_000.0) as i64),
            ..Default::default()
        };

        let config = Config {
            image: Some(spec.image.clone()),
            env: Some(env),
            exposed_ports: if exposed_ports.is_empty() {
                None
            } else {
                Some(exposed_ports)
            },
            host_config: Some(host_config),
            ..Default::default()
        };

        let created = self
            .docker
            .create_container(
                Some(CreateContainerOptions {
                    name: spec.name.clone(),
                    platform: None,
                }),
                config,
            )
            .await?;
        Ok(created.id)
    }

    async fn start_container(&self, name: &str) -> Result<(), OrchestratorError> {
        self.docker.start_container::<String>(name, None).await?;
        Ok(())
    }

    async fn stop_container(&self, name: &str, timeout_secs: i64) -> Result<(), OrchestratorError> {
        match self
            .docker
            .stop_container(name, Some(StopContainerOptions { t: timeout_secs }))
            .await
        {
            Ok(()) => Ok(()),
            Err(err) if Self::is_not_found(&err) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    async fn remove_container(&self, name: &str, force: bool) -> Result<(), OrchestratorError> {
        match self
            .docker
            .remove_container(
                name,
                Some(RemoveContainerOptions {
                    force,
                    v: true,
                    ..Default::default()
                }),
            )
            .await
        {
            Ok(()) => Ok(()),
            Err(err) if Self::is_not_found(&err) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    async fn is_running(&self, name: &str) -> Result<bool, OrchestratorError> {
        let info = self.docker.inspect_container(name, None).await?;
        Ok(info
            .state
            .and_then(|s| s.running)
            .unwrap_or(false))
    }

    async fn stats(&self, name: &str) -> Result<RawStats, OrchestratorError> {
        let mut stream = self.docker.stats(
            name,
            Some(StatsOptions {
                stream: false,
                one_shot: true,
            }),
        );
        let frame = match stream.next().await {
            Some(frame) => frame?,
            None => return Err(OrchestratorError::NotFound(name.to_string())),
        };

        let cpu = frame.cpu_stats;
        let precpu = frame.precpu_stats;
        let mem = frame.memory_stats;

        Ok(RawStats {
            running: true,
            cpu_total_usage: cpu.cpu_usage.total_usage,
            precpu_total_usage: precpu.cpu_usage.total_usage,
            system_cpu_usage: cpu.system_cpu_usage.unwrap_or(0),
            presystem_cpu_usage: precpu.system_cpu_usage.unwrap_or(0),
            memory_usage: mem.usage.unwrap_or(0),
            memory_limit: mem.limit.unwrap_or(1),
        })
    }

    async fn logs(&self, name: &str, tail: u32) -> Result<String, OrchestratorError> {
        let mut stream = self.docker.logs(
            name,
            Some(LogsOptions::<String> {
                stdout: true,
                stderr: true,
                tail: tail.to_string(),
                ..Default::default()
            }),
        );

        let mut out = String::new();
        while let Some(chunk) = stream.next().await {
            out.push_str(&chunk?.to_string());
        }
        Ok(out)
    }
}
