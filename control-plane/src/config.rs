use std::net::SocketAddr;

/// Command-line configuration for the control plane. Every flag also reads
/// from its matching environment variable.
#[derive(clap::Parser, Debug)]
pub struct Cli {
    #[clap(long, env, default_value = "0.0.0.0:8000")]
    pub bind_addr: SocketAddr,

    #[clap(long, env, default_value = "control-plane.db")]
    pub db_path: String,

    /// Shared secret presented to node agents, and compared against the
    /// token in incoming wake webhooks.
    #[clap(long, env)]
    pub node_secret: String,

    /// Base URL of the node agent this control plane drives.
    #[clap(long, env, default_value = "http://localhost:8001")]
    pub node_agent_url: String,

    #[clap(long, env, default_value = "300")]
    pub tick_interval_secs: u64,
}
