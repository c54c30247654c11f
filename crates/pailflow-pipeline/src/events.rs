use tracing::{info, instrument, warn};

use crate::context::PipelineContext;
use crate::error::Result;
use crate::speaker::SpeakerTracker;
use crate::transcript::Participant;

/// `on_participant_joined(p)`: rebuilds the participants map from a
/// transport snapshot and appends newly-seen session ids to join order,
/// excluding the bot's own session (spec.md §4.2).
#[instrument(skip(ctx, snapshot))]
pub fn on_participant_joined(
    ctx: &PipelineContext,
    snapshot: Vec<Participant>,
    bot_session_id: Option<&str>,
) {
    ctx.transcript.sync_participants(snapshot, bot_session_id);
}

/// `on_active_speaker_changed(event)`: binds the speaker tracker's
/// `last_speaker_id` to the transport-reported `peer_id` (spec.md §4.2).
#[instrument(skip(speaker_tracker))]
pub fn on_active_speaker_changed(
    speaker_tracker: &SpeakerTracker,
    active_speaker_peer_id: Option<&str>,
    fallback_id: &str,
) {
    let peer_id = active_speaker_peer_id.unwrap_or(fallback_id);
    if let Some(last_speaker_id) = speaker_tracker.last_speaker_id() {
        speaker_tracker.bind(&last_speaker_id, peer_id);
    }
}

/// `on_first_participant_joined`: queues the one-shot "introduce yourself"
/// turn by sending an `LLMRun` frame (spec.md §4.2). The caller supplies
/// the channel because the pipeline owns frame routing, not this module.
#[instrument(skip(tx))]
pub async fn on_first_participant_joined(tx: &tokio::sync::mpsc::Sender<crate::frame::Frame>) {
    let _ = tx.send(crate::frame::Frame::LLMRun).await;
}

/// `participant-counts-updated`: log-only (spec.md §4.2).
pub fn on_participant_counts_updated(room_name: &str, count: usize) {
    info!(room_name, count, "participant counts updated");
}

/// `on_participant_left(p, reason)`: the shutdown gate. Does nothing unless
/// the bot is now the only participant left, in which case it resumes the
/// workflow (or falls back to the post-call pipeline) and cancels the
/// pipeline task (spec.md §4.2 steps 1-5).
#[instrument(skip(ctx), fields(room_name = %ctx.room_name))]
pub async fn on_participant_left(ctx: &PipelineContext, reason: &str) -> Result<()> {
    let present = ctx.room.participant_count().await;
    if present > 1 {
        info!(present, reason, "participant left, others remain — bot stays");
        return Ok(());
    }

    info!(reason, "only the bot remains — beginning shutdown");

    let thread_id = ctx.transcript.workflow_thread_id();

    match thread_id {
        Some(id) => {
            if let Err(err) = ctx.resumer.resume(id.as_str()).await {
                warn!(workflow_thread_id = %id, error = %err, "resume failed, falling back to post-call pipeline");
                ctx.resumer.run_post_call(id.as_str()).await?;
            }
        }
        None => {
            warn!("no workflow_thread_id known — invoking post-call pipeline without a resume");
        }
    }

    ctx.cancel.cancel();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;
    use crate::transcript::TranscriptHandler;
    use async_trait::async_trait;
    use pailflow_core::types::WorkflowThread;
    use pailflow_store::PailflowStore;
    use std::sync::{atomic::{AtomicBool, AtomicUsize, Ordering}, Arc, RwLock};
    use tokio_util::sync::CancellationToken;

    struct FixedRoom(AtomicUsize);

    #[async_trait]
    impl crate::context::RoomQuery for FixedRoom {
        async fn participant_count(&self) -> usize {
            self.0.load(Ordering::SeqCst)
        }
        async fn leave(&self, _timeout_ms: u64) -> Result<()> {
            Ok(())
        }
    }

    struct RecordingResumer {
        resumed: AtomicBool,
        fallback: AtomicBool,
        fail_resume: bool,
    }

    #[async_trait]
    impl crate::context::WorkflowResumer for RecordingResumer {
        async fn resume(&self, _workflow_thread_id: &str) -> Result<()> {
            self.resumed.store(true, Ordering::SeqCst);
            if self.fail_resume {
                return Err(crate::error::PipelineError::Transport("boom".to_string()));
            }
            Ok(())
        }
        async fn run_post_call(&self, _workflow_thread_id: &str) -> Result<()> {
            self.fallback.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    fn context_with(present: usize, fail_resume: bool) -> (PipelineContext, Arc<RecordingResumer>) {
        let store = Arc::new(PailflowStore::open_in_memory(None).unwrap());
        let thread = WorkflowThread::new("room-1", "https://meet.example/room-1");
        let id = thread.workflow_thread_id.clone();
        store.workflow_threads.create(&thread).unwrap();
        let join_order = Arc::new(RwLock::new(Vec::new()));
        let transcript = Arc::new(TranscriptHandler::new(
            "room-1",
            "Pailbot",
            store,
            Some(id),
            join_order.clone(),
        ));
        let resumer = Arc::new(RecordingResumer {
            resumed: AtomicBool::new(false),
            fallback: AtomicBool::new(false),
            fail_resume,
        });
        let ctx = PipelineContext {
            room_name: "room-1".to_string(),
            transcript,
            speaker_tracker: Arc::new(SpeakerTracker::new(join_order)),
            room: Arc::new(FixedRoom(AtomicUsize::new(present))),
            resumer: resumer.clone() as Arc<dyn crate::context::WorkflowResumer>,
            cancel: CancellationToken::new(),
        };
        (ctx, resumer)
    }

    #[tokio::test]
    async fn bot_stays_while_others_present() {
        let (ctx, resumer) = context_with(2, false);
        on_participant_left(&ctx, "left").await.unwrap();
        assert!(!resumer.resumed.load(Ordering::SeqCst));
        assert!(!ctx.cancel.is_cancelled());
    }

    #[tokio::test]
    async fn sole_remaining_bot_resumes_and_cancels() {
        let (ctx, resumer) = context_with(1, false);
        on_participant_left(&ctx, "left").await.unwrap();
        assert!(resumer.resumed.load(Ordering::SeqCst));
        assert!(!resumer.fallback.load(Ordering::SeqCst));
        assert!(ctx.cancel.is_cancelled());
    }

    #[tokio::test]
    async fn resume_failure_falls_back_to_post_call() {
        let (ctx, resumer) = context_with(1, true);
        on_participant_left(&ctx, "left").await.unwrap();
        assert!(resumer.resumed.load(Ordering::SeqCst));
        assert!(resumer.fallback.load(Ordering::SeqCst));
        assert!(ctx.cancel.is_cancelled());
    }

    #[tokio::test]
    async fn first_participant_joined_queues_llm_run() {
        let (tx, mut rx) = tokio::sync::mpsc::channel(1);
        on_first_participant_joined(&tx).await;
        assert!(matches!(rx.recv().await, Some(Frame::LLMRun)));
    }

    #[test]
    fn active_speaker_binds_last_speaker() {
        let join_order = Arc::new(RwLock::new(vec!["p1".to_string()]));
        let tracker = SpeakerTracker::new(join_order);
        tracker.set_last_speaker_id(Some("dg-0".to_string()));
        on_active_speaker_changed(&tracker, Some("peer-42"), "fallback");
        assert_eq!(tracker.mapped_participant("dg-0"), Some("peer-42".to_string()));
    }
}
