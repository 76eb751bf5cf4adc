use std::time::Duration;

use crate::error::ProxyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Tcp,
    Udp,
}

/// Configuration read from the environment, matching the variable set the
/// original proxy sidecar expected. There is no CLI surface here: this
/// binary is always launched by the orchestrator with a fixed env block,
/// never by hand.
#[derive(Debug, Clone)]
pub struct Config {
    pub target_host: String,
    pub target_port: u16,
    pub listen_port: u16,
    pub protocol: Protocol,
    pub backend_webhook_url: String,
    pub server_id: i64,
    pub webhook_token: String,
    pub hold_timeout: Duration,
    pub retry_interval: Duration,
}

fn env_var(name: &'static str) -> Result<String, ProxyError> {
    std::env::var(name).map_err(|_| ProxyError::MissingEnv(name))
}

fn env_var_opt(name: &'static str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_u16(name: &'static str, value: String) -> Result<u16, ProxyError> {
    value
        .parse()
        .map_err(|_| ProxyError::InvalidEnv(name, value))
}

impl Config {
    pub fn from_env() -> Result<Self, ProxyError> {
        let target_host = env_var_opt("TARGET_HOST", "localhost");
        let target_port = parse_u16("TARGET_PORT", env_var_opt("TARGET_PORT", "25565"))?;
        let listen_port = parse_u16("LISTEN_PORT", env_var_opt("LISTEN_PORT", "25565"))?;

        let protocol = match env_var_opt("PROTOCOL", "tcp").to_ascii_uppercase().as_str() {
            "UDP" => Protocol::Udp,
            _ => Protocol::Tcp,
        };

        let backend_webhook_url = env_var("BACKEND_WEBHOOK_URL")?;
        let server_id_raw = env_var("SERVER_ID")?;
        let server_id = server_id_raw
            .parse()
            .map_err(|_| ProxyError::InvalidEnv("SERVER_ID", server_id_raw))?;
        let webhook_token = env_var("WEBHOOK_TOKEN")?;

        let hold_timeout_secs: u64 = env_var_opt("HOLD_TIMEOUT", "60")
            .parse()
            .map_err(|_| ProxyError::InvalidEnv("HOLD_TIMEOUT", "not a number".to_string()))?;
        let retry_interval_secs: u64 = env_var_opt("RETRY_INTERVAL", "2")
            .parse()
            .map_err(|_| ProxyError::InvalidEnv("RETRY_INTERVAL", "not a number".to_string()))?;

        Ok(Config {
            target_host,
            target_port,
            listen_port,
            protocol,
            backend_webhook_url,
            server_id,
            webhook_token,
            hold_timeout: Duration::from_secs(hold_timeout_secs),
            retry_interval: Duration::from_secs(retry_interval_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_u16_rejects_garbage() {
        let err = parse_u16("LISTEN_PORT", "not-a-port".to_string()).unwrap_err();
        assert!(matches!(err, ProxyError::InvalidEnv("LISTEN_PORT", _)));
    }
}
