use std::time::Duration;

use serde::Serialize;
use tracing::{error, info};

use crate::config::Config;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct WakePayload<'a> {
    server_id: i64,
    token: &'a str,
}

/// Fires the wake webhook and returns whether it was accepted. The session
/// never blocks on this: target reachability, not the webhook response, is
/// what actually releases a held connection.
pub async fn send_wake_signal(config: &Config) -> bool {
    info!(server_id = config.server_id, "sending wake signal");
    let client = reqwest::Client::new();
    let payload = WakePayload {
        server_id: config.server_id,
        token: &config.webhook_token,
    };

    let result = client
        .post(&config.backend_webhook_url)
        .json(&payload)
        .timeout(WEBHOOK_TIMEOUT)
        .send()
        .await;

    match result {
        Ok(response) if response.status().is_success() => {
            info!("wake signal sent successfully");
            true
        }
        Ok(response) => {
            error!(status = %response.status(), "wake signal rejected");
            false
        }
        Err(err) => {
            error!(%err, "failed to send wake signal");
            false
        }
    }
}
