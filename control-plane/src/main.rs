use std::sync::Arc;
use std::time::Duration;

use clap::Parser as _;
use control_plane::db::Repo;
use control_plane::lifecycle::LifecycleController;
use control_plane::node_client::NodeClient;
use control_plane::{webhook, AppState, Cli};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

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

    let repo = Repo::connect(&cli.db_path).await?;
    let node_client = NodeClient::new(
        reqwest::Client::new(),
        cli.node_agent_url.clone(),
        cli.node_secret.clone(),
    );
    let lifecycle = Arc::new(LifecycleController::new(
        repo.clone(),
        node_client,
        cli.node_secret.clone(),
        Duration::from_secs(cli.tick_interval_secs),
    ));

    let cancel = CancellationToken::new();
    let lifecycle_task = tokio::spawn(lifecycle.clone().run(cancel.clone()));

    let state = AppState { repo, lifecycle };
    let app = webhook::router(state).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(cli.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "control plane listening");
    axum::serve(listener, app).await?;

    cancel.cancel();
    let _ = lifecycle_task.await;

    Ok(())
}
