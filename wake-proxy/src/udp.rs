use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::ProxyError;
use crate::reachability::probe;
use crate::wake::send_wake_signal;

const RECV_BUFFER_SIZE: usize = 8 * 1024;
const DATAGRAM_QUEUE_CAP: usize = 32;
/// The session actor's channel buffer. Kept well above `DATAGRAM_QUEUE_CAP`
/// so the channel itself never backs up and silently drops the *newest*
/// datagram before it reaches the actor's own queue, which is the only
/// place overflow is meant to drop the oldest one instead.
const SESSION_CHANNEL_CAP: usize = DATAGRAM_QUEUE_CAP * 4;
const REAPER_INTERVAL: Duration = Duration::from_secs(120);

enum SessionEvent {
    Datagram(Vec<u8>),
    TargetReachable,
}

struct SessionHandle {
    tx: mpsc::Sender<SessionEvent>,
    last_activity: Arc<Mutex<Instant>>,
}

type Sessions = Arc<Mutex<HashMap<SocketAddr, SessionHandle>>>;

pub async fn serve(config: Arc<Config>) -> Result<(), ProxyError> {
    let socket = Arc::new(UdpSocket::bind(("0.0.0.0", config.listen_port)).await?);
    info!(port = config.listen_port, "UDP proxy listening");

    let sessions: Sessions = Arc::new(Mutex::new(HashMap::new()));
    tokio::spawn(reap_idle_sessions(sessions.clone(), config.clone()));

    let mut buf = [0u8; RECV_BUFFER_SIZE];
    loop {
        let (len, addr) = socket.recv_from(&mut buf).await?;
        let datagram = buf[..len].to_vec();
        dispatch(&sessions, &socket, &config, addr, datagram);
    }
}

fn dispatch(sessions: &Sessions, socket: &Arc<UdpSocket>, config: &Arc<Config>, addr: SocketAddr, datagram: Vec<u8>) {
    let mut sessions_guard = sessions.lock().unwrap();
    let handle = sessions_guard.entry(addr).or_insert_with(|| {
        let (tx, rx) = mpsc::channel(SESSION_CHANNEL_CAP);
        let last_activity = Arc::new(Mutex::new(Instant::now()));
        tokio::spawn(run_session(addr, socket.clone(), config.clone(), rx, tx.clone()));
        SessionHandle { tx, last_activity }
    });
    *handle.last_activity.lock().unwrap() = Instant::now();
    let tx = handle.tx.clone();
    drop(sessions_guard);

    if tx.try_send(SessionEvent::Datagram(datagram)).is_err() {
        debug!(%addr, "session busy, dropping datagram");
    }
}

/// Owns one client's relationship to the target: buffers datagrams while the
/// target is down, and once it becomes reachable, drains the queue in order
/// and forwards steady-state.
async fn run_session(
    addr: SocketAddr,
    server_socket: Arc<UdpSocket>,
    config: Arc<Config>,
    mut rx: mpsc::Receiver<SessionEvent>,
    self_tx: mpsc::Sender<SessionEvent>,
) {
    let mut target_socket: Option<Arc<UdpSocket>> = None;
    let mut queue: VecDeque<Vec<u8>> = VecDeque::new();
    let mut forward_task: Option<JoinHandle<()>> = None;
    let mut waker_started = false;

    while let Some(event) = rx.recv().await {
        match event {
            SessionEvent::Datagram(data) => {
                if let Some(sock) = &target_socket {
                    if let Err(err) = sock.send(&data).await {
                        error!(%addr, %err, "failed forwarding datagram to target");
                    }
                    continue;
                }

                if probe(&config.target_host, config.target_port).await {
                    if let Err(err) = connect_and_flush(
                        &mut target_socket,
                        &mut forward_task,
                        &mut queue,
                        &server_socket,
                        &config,
                        addr,
                        Some(data),
                    )
                    .await
                    {
                        error!(%addr, %err, "failed connecting to now-reachable target");
                    }
                    continue;
                }

                if queue.len() >= DATAGRAM_QUEUE_CAP {
                    warn!(%addr, "datagram queue cap exceeded, dropping oldest");
                    queue.pop_front();
                }
                let first = queue.is_empty();
                queue.push_back(data);
                if first && !waker_started {
                    waker_started = true;
                    info!(%addr, "UDP target unreachable, initiating wake for client");
                    tokio::spawn(send_wake_signal_for_session(config.clone()));
                    tokio::spawn(poll_until_reachable(config.clone(), self_tx.clone()));
                }
            }
            SessionEvent::TargetReachable => {
                if target_socket.is_some() {
                    continue;
                }
                if let Err(err) = connect_and_flush(
                    &mut target_socket,
                    &mut forward_task,
                    &mut queue,
                    &server_socket,
                    &config,
                    addr,
                    None,
                )
                .await
                {
                    error!(%addr, %err, "failed connecting after wake notification");
                }
            }
        }
    }

    if let Some(task) = forward_task {
        task.abort();
    }
}

async fn send_wake_signal_for_session(config: Arc<Config>) {
    send_wake_signal(&config).await;
}

/// Polls target reachability on `config.retry_interval` until it comes up or
/// `hold_timeout` elapses. On success, notifies the owning session so it can
/// drain its queue; on timeout it simply stops — the queued datagrams are
/// dropped once the idle reaper collects the session.
async fn poll_until_reachable(config: Arc<Config>, notify: mpsc::Sender<SessionEvent>) {
    let start = Instant::now();
    loop {
        if start.elapsed() >= config.hold_timeout {
            warn!("UDP hold timeout, target never became reachable");
            return;
        }
        if probe(&config.target_host, config.target_port).await {
            let _ = notify.send(SessionEvent::TargetReachable).await;
            return;
        }
        tokio::time::sleep(config.retry_interval).await;
    }
}

async fn connect_and_flush(
    target_socket: &mut Option<Arc<UdpSocket>>,
    forward_task: &mut Option<JoinHandle<()>>,
    queue: &mut VecDeque<Vec<u8>>,
    server_socket: &Arc<UdpSocket>,
    config: &Arc<Config>,
    client_addr: SocketAddr,
    incoming: Option<Vec<u8>>,
) -> Result<(), std::io::Error> {
    let socket = UdpSocket::bind(("0.0.0.0", 0)).await?;
    socket.connect((config.target_host.as_str(), config.target_port)).await?;
    let socket = Arc::new(socket);

    for queued in queue.drain(..) {
        let _ = socket.send(&queued).await;
    }
    if let Some(data) = incoming {
        let _ = socket.send(&data).await;
    }

    *forward_task = Some(tokio::spawn(forward_target_to_client(
        socket.clone(),
        server_socket.clone(),
        client_addr,
    )));
    *target_socket = Some(socket);
    Ok(())
}

async fn forward_target_to_client(target_socket: Arc<UdpSocket>, server_socket: Arc<UdpSocket>, client_addr: SocketAddr) {
    let mut buf = [0u8; RECV_BUFFER_SIZE];
    loop {
        match target_socket.recv(&mut buf).await {
            Ok(n) => {
                if let Err(err) = server_socket.send_to(&buf[..n], client_addr).await {
                    error!(%err, "failed relaying datagram back to client");
                    return;
                }
            }
            Err(err) => {
                debug!(%err, "target UDP socket closed");
                return;
            }
        }
    }
}

async fn reap_idle_sessions(sessions: Sessions, config: Arc<Config>) {
    let idle_after = config.hold_timeout * 4;
    let mut ticker = tokio::time::interval(REAPER_INTERVAL);
    loop {
        ticker.tick().await;
        let mut sessions_guard = sessions.lock().unwrap();
        let before = sessions_guard.len();
        sessions_guard.retain(|_, handle| handle.last_activity.lock().unwrap().elapsed() < idle_after);
        let reaped = before - sessions_guard.len();
        if reaped > 0 {
            debug!(reaped, "reaped idle UDP sessions");
        }
    }
}
