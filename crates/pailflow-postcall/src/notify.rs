use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::Result;

/// Sends one result email. No vendor SDK wiring — opaque provider behind a
/// trait the way `pailflow_pipeline::node`'s engine seams keep vendor code
/// out of the core (spec.md §1 "no vendor SDK wiring").
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()>;
}

/// Composes and sends the result email (spec.md §4.4 step 6). Subject
/// mirrors the original's `<interview_type> - <participant_name>` shape.
pub async fn send_email(
    sender: &dyn EmailSender,
    to: &str,
    participant_name: &str,
    interview_type: &str,
    body: &str,
) -> Result<()> {
    let subject = format!("{interview_type} - {participant_name}");
    sender.send(to, &subject, body).await
}

const MAX_WEBHOOK_ATTEMPTS: u32 = 3;
const WEBHOOK_BACKOFF_BASE: Duration = Duration::from_millis(500);

/// POSTs the webhook payload with bounded exponential backoff on 5xx
/// (spec.md §4.4 step 7), grounded on
/// `skynet_channels::manager::connect_with_backoff`'s retry schedule,
/// generalized from "connect" to "POST" and capped at 3 attempts per spec.
pub async fn post_webhook(
    client: &reqwest::Client,
    url: &str,
    body: &serde_json::Value,
) -> Result<bool> {
    let mut delay = WEBHOOK_BACKOFF_BASE;

    for attempt in 1..=MAX_WEBHOOK_ATTEMPTS {
        let response = client.post(url).json(body).send().await;
        match response {
            Ok(res) if res.status().is_success() => {
                info!(attempt, "webhook delivered");
                return Ok(true);
            }
            Ok(res) if res.status().is_server_error() && attempt < MAX_WEBHOOK_ATTEMPTS => {
                warn!(attempt, status = %res.status(), "webhook 5xx, retrying");
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
            Ok(res) => {
                warn!(attempt, status = %res.status(), "webhook delivery failed, giving up");
                return Ok(false);
            }
            Err(err) if attempt < MAX_WEBHOOK_ATTEMPTS => {
                warn!(attempt, error = %err, "webhook request error, retrying");
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
            Err(err) => {
                warn!(attempt, error = %err, "webhook request error, giving up");
                return Ok(false);
            }
        }
    }
    Ok(false)
}
