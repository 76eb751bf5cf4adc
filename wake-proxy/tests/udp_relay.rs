use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, UdpSocket};
use wake_proxy::{udp, Config, Protocol};

fn test_config(listen_port: u16, target_port: u16) -> Arc<Config> {
    Arc::new(Config {
        target_host: "127.0.0.1".to_string(),
        target_port,
        listen_port,
        protocol: Protocol::Udp,
        backend_webhook_url: "http://127.0.0.1:1/api/webhook/wake".to_string(),
        server_id: 2,
        webhook_token: "test-token".to_string(),
        hold_timeout: Duration::from_secs(5),
        retry_interval: Duration::from_millis(150),
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn buffered_datagrams_flush_in_order_once_target_is_reachable() {
    let listen_port = 19200;
    let target_port = 19201;
    let config = test_config(listen_port, target_port);

    tokio::spawn(udp::serve(config));
    tokio::time::sleep(Duration::from_millis(100)).await;

    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    client.connect(("127.0.0.1", listen_port)).await.unwrap();
    client.send(b"D1").await.unwrap();
    client.send(b"D2").await.unwrap();
    client.send(b"D3").await.unwrap();

    // Target is still down; give the proxy time to queue all three before
    // it comes online.
    tokio::time::sleep(Duration::from_millis(300)).await;

    // The reachability probe is TCP-based even for a UDP target, so the
    // target container must expose both.
    let _tcp_listener = TcpListener::bind(("127.0.0.1", target_port)).await.unwrap();
    let target_udp = UdpSocket::bind(("127.0.0.1", target_port)).await.unwrap();

    let mut buf = [0u8; 16];
    let (n, _) = target_udp.recv_from(&mut buf).await.unwrap();
    assert_eq!(&buf[..n], b"D1");
    let (n, _) = target_udp.recv_from(&mut buf).await.unwrap();
    assert_eq!(&buf[..n], b"D2");
    let (n, _) = target_udp.recv_from(&mut buf).await.unwrap();
    assert_eq!(&buf[..n], b"D3");
}
