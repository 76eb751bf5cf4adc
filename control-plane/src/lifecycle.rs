use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use protocol::{Millicredits, ServerState};
use subtle::ConstantTimeEq;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::db::{Repo, TransactionKind};
use crate::error::ControlPlaneError;
use crate::node_client::NodeClient;

const IDLE_CPU_THRESHOLD_PERCENT: f64 = 5.0;
const IDLE_MINIMUM_MINUTES: i64 = 15;
const CREDITS_PER_TICK: i64 = 500; // 0.5 credits, in millicredits
const STAT_QUERY_CONCURRENCY: usize = 8;

/// Periodic reconciler: one idle sweep followed by one billing sweep per
/// tick, strictly ordered and never interleaved. Also the home of the
/// webhook-triggered wake path and manual credit top-ups, since both mutate
/// the same rows the sweeps do.
pub struct LifecycleController {
    repo: Repo,
    node_client: NodeClient,
    webhook_token: String,
    tick_interval: Duration,
}

impl LifecycleController {
    pub fn new(repo: Repo, node_client: NodeClient, webhook_token: String, tick_interval: Duration) -> Self {
        LifecycleController {
            repo,
            node_client,
            webhook_token,
            tick_interval,
        }
    }

    /// Runs the reconcile loop until `cancel` fires. The in-flight tick is
    /// always allowed to finish; cancellation is only observed between
    /// ticks.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.tick_interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("lifecycle controller shutting down");
                    return;
                }
                _ = ticker.tick() => {
                    if let Err(err) = self.idle_sweep().await {
                        warn!(%err, "idle sweep failed");
                    }
                    if let Err(err) = self.billing_sweep().await {
                        warn!(%err, "billing sweep failed");
                    }
                }
            }
        }
    }

    async fn idle_sweep(&self) -> Result<(), ControlPlaneError> {
        let running = self.repo.list_servers_in_state(ServerState::Running).await?;
        let candidates: Vec<_> = running.into_iter().filter(|s| s.auto_sleep).collect();

        let semaphore = Arc::new(Semaphore::new(STAT_QUERY_CONCURRENCY));
        let mut handles = Vec::with_capacity(candidates.len());
        for server in candidates {
            let node_client = self.node_client.clone();
            let semaphore = semaphore.clone();
            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let stats = node_client.stats(server.id).await;
                (server, stats)
            }));
        }

        let mut to_hibernate = Vec::new();
        for handle in handles {
            let (server, stats) = match handle.await {
                Ok(result) => result,
                Err(err) => {
                    warn!(%err, "idle sweep stat task panicked");
                    continue;
                }
            };
            let stats = match stats {
                Ok(stats) => stats,
                Err(err) => {
                    warn!(server_id = server.id, %err, "skipping server, stat query failed");
                    continue;
                }
            };

            let idle_minutes = (Utc::now() - server.last_state_change).num_minutes();
            if stats.cpu_percent < IDLE_CPU_THRESHOLD_PERCENT && idle_minutes >= IDLE_MINIMUM_MINUTES {
                to_hibernate.push(server);
            }
        }

        for server in to_hibernate {
            if let Err(err) = self.node_client.hibernate(server.id).await {
                warn!(server_id = server.id, %err, "failed hibernating idle server");
                continue;
            }
            match self
                .repo
                .cas_server_state(server.id, ServerState::Running, ServerState::Sleeping)
                .await
            {
                Ok(true) => info!(server_id = server.id, "hibernated idle server"),
                Ok(false) => warn!(server_id = server.id, "idle hibernate lost state race, skipped"),
                Err(err) => warn!(server_id = server.id, %err, "failed recording idle hibernate"),
            }
        }

        Ok(())
    }

    async fn billing_sweep(&self) -> Result<(), ControlPlaneError> {
        let running = self.repo.list_servers_in_state(ServerState::Running).await?;
        let charge = Millicredits(CREDITS_PER_TICK);

        for server in running {
            let charged = self
                .repo
                .try_debit(
                    server.user_id,
                    charge,
                    TransactionKind::HourlyCharge,
                    &format!("usage charge for server {}", server.id),
                )
                .await?;

            if charged {
                continue;
            }

            warn!(server_id = server.id, "insufficient credits, hibernating");
            if let Err(err) = self.node_client.hibernate(server.id).await {
                warn!(server_id = server.id, %err, "failed hibernating unfunded server");
                continue;
            }
            if let Err(err) = self
                .repo
                .cas_server_state(server.id, ServerState::Running, ServerState::Sleeping)
                .await
            {
                warn!(server_id = server.id, %err, "failed recording credit hibernate");
            }
        }

        Ok(())
    }

    /// Wakes a server on behalf of a proxy sidecar's webhook call. Rejects
    /// (returns `false`, mutates nothing) on a bad token or an empty
    /// balance; otherwise asks the node agent to start the container and
    /// records the new state.
    pub async fn wake_on_webhook(&self, server_id: i64, token: &str) -> Result<bool, ControlPlaneError> {
        if !bool::from(token.as_bytes().ct_eq(self.webhook_token.as_bytes())) {
            return Ok(false);
        }

        let Some(server) = self.repo.get_server(server_id).await? else {
            return Ok(false);
        };
        let Some(owner) = self.repo.get_user(server.user_id).await? else {
            return Ok(false);
        };
        if owner.credits() <= Millicredits(0) {
            return Ok(false);
        }

        if self.node_client.wake(server_id).await.is_err() {
            return Ok(false);
        }

        let updated = self
            .repo
            .cas_server_state(server_id, server.state(), ServerState::Running)
            .await?;
        Ok(updated)
    }

    pub async fn add_credits(&self, user_id: i64, amount: Millicredits, description: &str) -> Result<(), ControlPlaneError> {
        self.repo.add_credits(user_id, amount, description).await
    }
}
