use std::sync::Arc;

use clap::Parser as _;
use node_agent::{routes, AppState, Cli};
use orchestrator_core::{BollardEngine, Orchestrator, PortAllocator};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const EPHEMERAL_PORT_RANGE: std::ops::RangeInclusive<u16> = 30000..=40000;

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

    let cli = Cli::parse();

    let engine = Arc::new(BollardEngine::connect()?);
    let ports = Arc::new(PortAllocator::new(EPHEMERAL_PORT_RANGE));
    let orchestrator = Arc::new(Orchestrator::new(
        engine,
        ports,
        cli.proxy_build_context.clone(),
    ));

    let state = AppState {
        orchestrator,
        node_secret: Arc::from(cli.node_secret.as_str()),
    };

    let app = routes::router(state).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(cli.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "node agent listening");
    axum::serve(listener, app).await?;

    Ok(())
}
