use chrono::{DateTime, Utc};
use protocol::{Millicredits, Protocol, ServerState};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub credits_millicredits: i64,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn credits(&self) -> Millicredits {
        Millicredits(self.credits_millicredits)
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct GameImage {
    pub id: i64,
    pub friendly_name: String,
    pub image_ref: String,
    pub default_internal_port: i64,
    pub min_ram_mb: i64,
    pub min_cpu: f64,
    pub protocol: String,
    pub description: Option<String>,
}

impl GameImage {
    pub fn protocol(&self) -> Protocol {
        match self.protocol.as_str() {
            "udp" => Protocol::Udp,
            _ => Protocol::Tcp,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Server {
    pub id: i64,
    pub user_id: i64,
    pub game_image_id: i64,
    pub friendly_name: String,
    pub env_vars: String,
    pub proxy_container_id: Option<String>,
    pub game_container_id: Option<String>,
    pub public_port: Option<i64>,
    pub private_network_name: Option<String>,
    pub state: String,
    pub auto_sleep: bool,
    pub created_at: DateTime<Utc>,
    pub last_state_change: DateTime<Utc>,
}

impl Server {
    pub fn state(&self) -> ServerState {
        match self.state.as_str() {
            "RUNNING" => ServerState::Running,
            "STARTING" => ServerState::Starting,
            "STOPPING" => ServerState::Stopping,
            _ => ServerState::Sleeping,
        }
    }

    pub fn env_vars(&self) -> std::collections::HashMap<String, String> {
        serde_json::from_str(&self.env_vars).unwrap_or_default()
    }
}

pub fn state_to_str(state: ServerState) -> &'static str {
    match state {
        ServerState::Running => "RUNNING",
        ServerState::Sleeping => "SLEEPING",
        ServerState::Starting => "STARTING",
        ServerState::Stopping => "STOPPING",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    Deposit,
    HourlyCharge,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionKind::Deposit => "DEPOSIT",
            TransactionKind::HourlyCharge => "HOURLY_CHARGE",
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Transaction {
    pub id: i64,
    pub user_id: i64,
    pub amount_millicredits: i64,
    pub kind: String,
    pub timestamp: DateTime<Utc>,
    pub description: Option<String>,
}
