use std::sync::Arc;
use std::time::Duration;

use pailflow_core::types::WorkflowThreadId;
use pailflow_pricing::calculate_stt_cost;
use pailflow_store::PailflowStore;
use pailflow_usage::{create_usage_transaction, TransactionOutcome, TransactionStore, UserStore};
use tracing::{instrument, warn};

use crate::context::RoomQuery;
use crate::error::{PipelineError, Result};

/// Substrings of native-layer shutdown noise that are logged and swallowed
/// rather than propagated (spec.md §4.2 shutdown step 7 — abrupt task
/// cancellation before transport cleanup is observed to cause native-layer
/// panics on shutdown, and these are expected, not fatal).
const BENIGN_SHUTDOWN_NOISE: [&str; 3] = ["panic", "rust", "Event loop is closed"];

fn is_benign_shutdown_noise(message: &str) -> bool {
    BENIGN_SHUTDOWN_NOISE
        .iter()
        .any(|needle| message.contains(needle))
}

/// Runs the 8-step shutdown sequence any pipeline exit path (normal
/// completion, cancellation, error) must go through (spec.md §4.2
/// "Shutdown sequencing"). Step 8 (registry removal) is the orchestrator's
/// responsibility — it owns the registry this function doesn't see.
#[instrument(skip(store, users, transactions, room), fields(workflow_thread_id = %thread_id))]
pub async fn shut_down_pipeline(
    store: &PailflowStore,
    users: &UserStore,
    transactions: &TransactionStore,
    thread_id: &WorkflowThreadId,
    rate_per_minute: f64,
    room: Arc<dyn RoomQuery>,
) -> Result<()> {
    let Some(mut thread) = store.workflow_threads.get(thread_id)? else {
        warn!("workflow thread missing at shutdown — nothing to finalize");
        return Ok(());
    };

    // Step 1-2: record bot_leave_time, compute + persist bot_duration_s.
    let leave_time = chrono::Utc::now();
    thread.bot_leave_time = Some(leave_time.to_rfc3339());
    if let Some(join_time) = thread
        .bot_join_time
        .as_deref()
        .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
    {
        let duration = (leave_time - join_time.with_timezone(&chrono::Utc)).num_seconds();
        thread.bot_duration_s = Some(duration.max(0));
    }
    store.workflow_threads.update(&thread)?;

    // Step 3: Deepgram STT cost, added to usage.
    if let Some(duration_s) = thread.bot_duration_s {
        let stt_cost = calculate_stt_cost(duration_s)?;
        pailflow_usage::update_workflow_usage_cost(store, thread_id, stt_cost, None)?;
    }

    // Re-read: usage tracker's read-modify-write above mutated total_cost_usd.
    let thread = store
        .workflow_threads
        .get(thread_id)?
        .ok_or_else(|| PipelineError::Store(pailflow_store::StoreError::ThreadNotFound(thread_id.to_string())))?;

    // Step 4: primary transaction-creation attempt (idempotent — §4.7).
    if thread.usage_stats.total_cost_usd > 0.0 && thread.bot_duration_s.unwrap_or(0) > 0 {
        match create_usage_transaction(users, transactions, &thread, rate_per_minute) {
            Ok(TransactionOutcome::Created { transaction_id, .. }) => {
                tracing::info!(transaction_id, "primary usage transaction created at shutdown");
            }
            Ok(other) => tracing::debug!(?other, "usage transaction already handled"),
            Err(err) => warn!(error = %err, "primary usage transaction attempt failed"),
        }
    }

    // Step 5: bounded transport cleanup.
    let leave_result = tokio::time::timeout(Duration::from_millis(2000), room.leave(2000)).await;
    match leave_result {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            let message = err.to_string();
            if is_benign_shutdown_noise(&message) {
                warn!(message, "native shutdown noise during transport cleanup — ignored");
            } else {
                warn!(message, "transport cleanup failed");
            }
        }
        Err(_) => warn!("transport cleanup timed out after 2s"),
    }

    // Step 6: let native audio-render threads drain.
    tokio::time::sleep(Duration::from_millis(1500)).await;

    Ok(())
}
