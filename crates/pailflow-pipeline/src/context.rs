use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::speaker::SpeakerTracker;
use crate::transcript::TranscriptHandler;

/// What `on_participant_left` needs from the room transport, without
/// `pailflow-pipeline` depending on any concrete transport crate
/// (grounded on `skynet_channels::channel::Channel`'s adapter-behind-a-trait
/// shape, generalized here to "the bit of the transport the event handlers
/// touch").
#[async_trait]
pub trait RoomQuery: Send + Sync {
    /// Count of participants currently present, including the bot.
    async fn participant_count(&self) -> usize;
    /// Initiate a graceful leave with a bounded timeout.
    async fn leave(&self, timeout_ms: u64) -> Result<()>;
}

/// What `on_participant_left` needs from the Durable Workflow Engine (C3)
/// and the Post-Call Pipeline (C4), without creating a dependency cycle —
/// `pailflow-orchestrator`/`pailflow-workflow` depend on
/// `pailflow-pipeline`, not the reverse, so the seam is defined here and
/// implemented there.
#[async_trait]
pub trait WorkflowResumer: Send + Sync {
    async fn resume(&self, workflow_thread_id: &str) -> Result<()>;
    async fn run_post_call(&self, workflow_thread_id: &str) -> Result<()>;
}

/// Immutable shared context passed by reference to the five event handlers
/// in [`crate::events`] (DESIGN NOTES §9 "Global mutable state in the
/// orchestrator" — constructed once per bot worker, passed around, never a
/// global singleton).
pub struct PipelineContext {
    pub room_name: String,
    pub transcript: Arc<TranscriptHandler>,
    pub speaker_tracker: Arc<SpeakerTracker>,
    pub room: Arc<dyn RoomQuery>,
    pub resumer: Arc<dyn WorkflowResumer>,
    pub cancel: CancellationToken,
}
