use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use wake_proxy::{tcp, udp, Config, Protocol};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_file(true)
                .with_line_number(true)
                .with_target(true)
                .with_thread_ids(true),
        )
        .init();

    let config = Arc::new(Config::from_env()?);
    info!(
        protocol = ?config.protocol,
        target = format!("{}:{}", config.target_host, config.target_port),
        "proxy starting"
    );

    match config.protocol {
        Protocol::Tcp => tcp::serve(config).await?,
        Protocol::Udp => udp::serve(config).await?,
    }

    Ok(())
}
