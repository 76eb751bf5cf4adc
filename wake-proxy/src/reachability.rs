use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::timeout;

const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// A single reachability probe: can we open a TCP connection to the target
/// within the probe deadline? Used for both TCP and UDP targets — UDP game
/// servers in this deployment always come up alongside a TCP-reachable
/// health port on the same container, so one probe kind covers both.
pub async fn probe(host: &str, port: u16) -> bool {
    match timeout(PROBE_TIMEOUT, TcpStream::connect((host, port))).await {
        Ok(Ok(_stream)) => true,
        _ => false,
    }
}
