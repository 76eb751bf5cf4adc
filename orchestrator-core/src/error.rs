use thiserror::Error;

/// Failure kinds for the container orchestrator. Mirrors the taxonomy the
/// rest of the workspace uses: transient/expected states get their own
/// variant so callers can decide whether to retry.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("server {0} already has a deployed bundle")]
    AlreadyDeployed(i64),

    #[error("no free public port available")]
    NoFreePort,

    #[error("container engine unreachable: {0}")]
    EngineUnreachable(#[source] bollard::errors::Error),

    #[error("container {0} not found")]
    NotFound(String),

    #[error("partial failure removing bundle for server {server_id}: {errors:?}")]
    PartialDelete {
        server_id: i64,
        errors: Vec<String>,
    },

    #[error("failed packing build context for image {tag}: {source}")]
    BuildContext {
        tag: String,
        #[source]
        source: std::io::Error,
    },
}

impl From<bollard::errors::Error> for OrchestratorError {
    fn from(err: bollard::errors::Error) -> Self {
        OrchestratorError::EngineUnreachable(err)
    }
}
