use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::ProxyError;
use crate::reachability::probe;
use crate::wake::send_wake_signal;

const COPY_BUFFER_SIZE: usize = 8 * 1024;
const SESSION_BUFFER_CAP: usize = 64 * 1024;

pub async fn serve(config: Arc<Config>) -> Result<(), ProxyError> {
    let listener = TcpListener::bind(("0.0.0.0", config.listen_port)).await?;
    info!(port = config.listen_port, "TCP proxy listening");

    loop {
        let (stream, peer_addr) = listener.accept().await?;
        let config = config.clone();
        tokio::spawn(async move {
            handle_client(stream, peer_addr, config).await;
        });
    }
}

async fn handle_client(client: TcpStream, peer_addr: SocketAddr, config: Arc<Config>) {
    info!(%peer_addr, "new TCP connection");

    if probe(&config.target_host, config.target_port).await {
        debug!(%peer_addr, "target reachable, bridging directly");
        match TcpStream::connect((config.target_host.as_str(), config.target_port)).await {
            Ok(target) => relay(client, target).await,
            Err(err) => error!(%err, "direct bridge connect failed"),
        }
        return;
    }

    info!(%peer_addr, "target unreachable, entering wake/hold");
    send_wake_signal(&config).await;

    match hold_and_buffer(client, &config).await {
        Some((client, target, buffer)) => {
            if !buffer.is_empty() {
                info!(bytes = buffer.len(), "flushing buffered bytes");
            }
            let mut target = target;
            if let Err(err) = target.write_all(&buffer).await {
                error!(%err, "failed flushing session buffer to target");
                return;
            }
            relay(client, target).await;
        }
        None => warn!(%peer_addr, "hold timeout, closing session"),
    }
}

/// Holds a client connection open, buffering its bytes (capped), while
/// polling target reachability. Returns the live client/target streams and
/// whatever was buffered once the target comes up, or `None` on timeout.
async fn hold_and_buffer(
    mut client: TcpStream,
    config: &Config,
) -> Option<(TcpStream, TcpStream, BytesMut)> {
    let start = Instant::now();
    let mut buffer = BytesMut::with_capacity(COPY_BUFFER_SIZE);
    let mut read_buf = [0u8; COPY_BUFFER_SIZE];

    loop {
        if start.elapsed() >= config.hold_timeout {
            return None;
        }

        match timeout(config.retry_interval, client.read(&mut read_buf)).await {
            Ok(Ok(0)) => return None, // client closed during hold
            Ok(Ok(n)) => {
                if buffer.len() + n > SESSION_BUFFER_CAP {
                    warn!("session buffer cap exceeded, closing session");
                    return None;
                }
                buffer.put_slice(&read_buf[..n]);
                debug!(bytes = n, "buffered bytes from client during hold");
            }
            Ok(Err(err)) => {
                error!(%err, "client read error during hold");
                return None;
            }
            Err(_timeout) => {} // no data this tick, fall through to probe
        }

        if probe(&config.target_host, config.target_port).await {
            match TcpStream::connect((config.target_host.as_str(), config.target_port)).await {
                Ok(target) => return Some((client, target, buffer)),
                Err(err) => {
                    error!(%err, "target became reachable but connect failed");
                    return None;
                }
            }
        }
    }
}

/// Bridges two already-connected streams full duplex. Either half closing
/// ends the whole session.
async fn relay(client: TcpStream, target: TcpStream) {
    let (mut client_read, mut client_write) = client.into_split();
    let (mut target_read, mut target_write) = target.into_split();

    let client_to_target = tokio::spawn(async move {
        copy_loop(&mut client_read, &mut target_write).await;
        "client closed"
    });
    let target_to_client = tokio::spawn(async move {
        copy_loop(&mut target_read, &mut client_write).await;
        "target closed"
    });

    let reason = tokio::select! {
        result = client_to_target => {
            target_to_client.abort();
            result.unwrap_or("client task panicked")
        }
        result = target_to_client => {
            client_to_target.abort();
            result.unwrap_or("target task panicked")
        }
    };
    debug!(reason, "session ended");
}

async fn copy_loop(
    reader: &mut (impl tokio::io::AsyncRead + Unpin),
    writer: &mut (impl AsyncWriteExt + Unpin),
) {
    let mut buf = [0u8; COPY_BUFFER_SIZE];
    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => return,
            Ok(n) => n,
            Err(err) => {
                error!(%err, "relay read error");
                return;
            }
        };
        if let Err(err) = writer.write_all(&buf[..n]).await {
            error!(%err, "relay write error");
            return;
        }
    }
}
