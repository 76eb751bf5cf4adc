use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use wake_proxy::{tcp, Config, Protocol};

fn test_config(listen_port: u16, target_port: u16) -> Arc<Config> {
    Arc::new(Config {
        target_host: "127.0.0.1".to_string(),
        target_port,
        listen_port,
        protocol: Protocol::Tcp,
        // port 1 is reserved/unroutable, so the wake POST fails fast without
        // a real control plane running; the session's hold loop does not
        // depend on it succeeding.
        backend_webhook_url: "http://127.0.0.1:1/api/webhook/wake".to_string(),
        server_id: 1,
        webhook_token: "test-token".to_string(),
        hold_timeout: Duration::from_secs(5),
        retry_interval: Duration::from_millis(200),
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cold_connection_is_held_then_bridged_once_target_comes_up() {
    let listen_port = 19100;
    let target_port = 19101;
    let config = test_config(listen_port, target_port);

    tokio::spawn(tcp::serve(config));
    tokio::time::sleep(Duration::from_millis(100)).await;

    let mut client = TcpStream::connect(("127.0.0.1", listen_port)).await.unwrap();
    client.write_all(b"HELLO\n").await.unwrap();

    // Target is still down; give the proxy a moment to enter the hold loop
    // before it comes online.
    tokio::time::sleep(Duration::from_millis(300)).await;

    let target_listener = TcpListener::bind(("127.0.0.1", target_port)).await.unwrap();
    let (mut target_conn, _) = target_listener.accept().await.unwrap();

    let mut received = vec![0u8; 6];
    target_conn.read_exact(&mut received).await.unwrap();
    assert_eq!(&received, b"HELLO\n");

    client.write_all(b"more").await.unwrap();
    let mut more = vec![0u8; 4];
    target_conn.read_exact(&mut more).await.unwrap();
    assert_eq!(&more, b"more");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn already_reachable_target_bridges_directly() {
    let listen_port = 19110;
    let target_port = 19111;
    let config = test_config(listen_port, target_port);

    let target_listener = TcpListener::bind(("127.0.0.1", target_port)).await.unwrap();
    tokio::spawn(tcp::serve(config));
    tokio::time::sleep(Duration::from_millis(100)).await;

    let accept_task = tokio::spawn(async move { target_listener.accept().await.unwrap().0 });

    let mut client = TcpStream::connect(("127.0.0.1", listen_port)).await.unwrap();
    client.write_all(b"PING").await.unwrap();

    let mut target_conn = accept_task.await.unwrap();
    let mut received = vec![0u8; 4];
    target_conn.read_exact(&mut received).await.unwrap();
    assert_eq!(&received, b"PING");
}
