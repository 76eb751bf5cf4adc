use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("missing required environment variable {0}")]
    MissingEnv(&'static str),

    #[error("invalid value for environment variable {0}: {1}")]
    InvalidEnv(&'static str, String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
