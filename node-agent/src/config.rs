use std::net::SocketAddr;
use std::path::PathBuf;

/// Command-line configuration for the node agent. Every flag also reads
/// from its matching environment variable, so the same binary can be
/// launched identically from a shell or from a container's `env:` block.
#[derive(clap::Parser, Debug)]
pub struct Cli {
    #[clap(long, env, default_value = "0.0.0.0:8001")]
    pub bind_addr: SocketAddr,

    /// Shared secret every request must present in `X-Node-Secret`.
    #[clap(long, env)]
    pub node_secret: String,

    /// Directory holding the proxy sidecar's Dockerfile. Built once into
    /// `wake-proxy:latest` and reused across every deploy on this node.
    #[clap(long, env, default_value = "wake-proxy")]
    pub proxy_build_context: PathBuf,
}
