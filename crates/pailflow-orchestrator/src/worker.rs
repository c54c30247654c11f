use std::sync::{Arc, RwLock};

use pailflow_core::types::WorkflowThreadId;
use pailflow_pipeline::{PipelineContext, RoomQuery, SpeakerTracker, TranscriptHandler, WorkflowResumer};
use pailflow_store::PailflowStore;
use pailflow_usage::{TransactionStore, UserStore};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::session::{SessionRequest, SessionRuntime};

/// Wraps one Media Pipeline run with the shutdown sequencing of spec.md
/// §4.2 — the part of a bot worker this core owns regardless of which
/// vendor-backed [`SessionRuntime`] actually drives the session.
pub struct BotWorker {
    pub store: Arc<PailflowStore>,
    pub users: Arc<UserStore>,
    pub transactions: Arc<TransactionStore>,
    pub rate_per_minute: f64,
}

impl BotWorker {
    /// Builds the shared pipeline context, runs the session to completion
    /// (swallowing any error the way spec.md §4.2 step 7 requires), then
    /// always runs the shutdown sequence — regardless of how the run
    /// ended (normal completion, cancellation, error).
    pub async fn run_to_completion(
        &self,
        runtime: Arc<dyn SessionRuntime>,
        request: SessionRequest,
        room: Arc<dyn RoomQuery>,
        resumer: Arc<dyn WorkflowResumer>,
        cancel: CancellationToken,
    ) {
        let thread_id = request.workflow_thread_id.clone();
        let bot_name = request
            .bot_config
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or("Bot")
            .to_string();

        let participant_join_order = Arc::new(RwLock::new(Vec::new()));
        let transcript = Arc::new(TranscriptHandler::new(
            request.room_name.clone(),
            bot_name,
            self.store.clone(),
            Some(thread_id.clone()),
            participant_join_order.clone(),
        ));
        let speaker_tracker = Arc::new(SpeakerTracker::new(participant_join_order));

        let ctx = PipelineContext {
            room_name: request.room_name.clone(),
            transcript,
            speaker_tracker,
            room: room.clone(),
            resumer,
            cancel: cancel.clone(),
        };

        if let Err(err) = runtime.run(request, ctx).await {
            let message = err.to_string();
            warn!(workflow_thread_id = %thread_id, error = %message, "session runtime exited with error");
        }

        self.shut_down(&thread_id, room).await;
    }

    async fn shut_down(&self, thread_id: &WorkflowThreadId, room: Arc<dyn RoomQuery>) {
        if let Err(err) = pailflow_pipeline::shutdown::shut_down_pipeline(
            &self.store,
            &self.users,
            &self.transactions,
            thread_id,
            self.rate_per_minute,
            room,
        )
        .await
        {
            warn!(workflow_thread_id = %thread_id, error = %err, "shutdown sequence failed");
        }
    }
}
