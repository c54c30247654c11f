use pailflow_core::types::WorkflowThreadId;
use pailflow_postcall::{run_post_call, EmailSender, InsightsLlm};
use pailflow_store::{CheckpointStore, PailflowStore};
use pailflow_usage::{TransactionStore, UserStore};
use tracing::{info, warn};

use crate::error::{Result, WorkflowError};

/// Everything `run_post_call` needs, bundled so `resume_or_fallback` stays
/// a four-argument call the way spec.md §4.3 describes it
/// (`resume::resume_or_fallback(engine, store, postcall, thread_id)`).
pub struct ResumeContext<'a> {
    pub store: &'a PailflowStore,
    pub users: &'a UserStore,
    pub transactions: &'a TransactionStore,
    pub llm: &'a dyn InsightsLlm,
    pub http_client: &'a reqwest::Client,
    pub email_sender: Option<&'a dyn EmailSender>,
    pub rate_per_minute: f64,
}

/// Implements the resume protocol of spec.md §4.3: read the checkpoint,
/// advance through `process_transcript` (which is exactly the Post-Call
/// Pipeline), and on any error along that path fall back to invoking the
/// pipeline directly so a session's transcript is never left unprocessed.
pub async fn resume_or_fallback(
    checkpointer: &dyn CheckpointStore,
    ctx: &ResumeContext<'_>,
    thread_id: &WorkflowThreadId,
) -> Result<()> {
    match checkpointer.latest(thread_id) {
        Ok(Some(record)) if !record.state.is_null() => {
            info!(workflow_thread_id = %thread_id, "resuming from checkpoint");
        }
        Ok(_) => {
            warn!(workflow_thread_id = %thread_id, "checkpoint missing or empty, falling back to direct post-call");
            return fall_back(ctx, thread_id).await;
        }
        Err(err) => {
            warn!(workflow_thread_id = %thread_id, error = %err, "checkpoint read failed, falling back to direct post-call");
            return fall_back(ctx, thread_id).await;
        }
    }

    match process_transcript(ctx, thread_id).await {
        Ok(()) => Ok(()),
        Err(err) => {
            warn!(workflow_thread_id = %thread_id, error = %err, "resume from checkpoint failed, falling back to direct post-call");
            fall_back(ctx, thread_id).await
        }
    }
}

/// The `process_transcript` node: runs the Post-Call Pipeline and clears
/// `workflow_paused` on success (spec.md §4.3).
async fn process_transcript(ctx: &ResumeContext<'_>, thread_id: &WorkflowThreadId) -> Result<()> {
    run_post_call(
        ctx.store,
        ctx.users,
        ctx.transactions,
        ctx.llm,
        ctx.http_client,
        ctx.email_sender,
        ctx.rate_per_minute,
        thread_id,
    )
    .await?;

    if let Some(mut thread) = ctx.store.workflow_threads.get(thread_id)? {
        thread.workflow_paused = false;
        ctx.store.workflow_threads.update(&thread)?;
    }
    Ok(())
}

async fn fall_back(ctx: &ResumeContext<'_>, thread_id: &WorkflowThreadId) -> Result<()> {
    run_post_call(
        ctx.store,
        ctx.users,
        ctx.transactions,
        ctx.llm,
        ctx.http_client,
        ctx.email_sender,
        ctx.rate_per_minute,
        thread_id,
    )
    .await
    .map_err(WorkflowError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pailflow_core::types::WorkflowThread;
    use pailflow_postcall::LlmCompletion;
    use pailflow_store::InMemoryCheckpointStore;
    use rusqlite::Connection;

    struct StubLlm;

    #[async_trait]
    impl InsightsLlm for StubLlm {
        async fn complete_json(&self, _prompt: &str) -> pailflow_postcall::Result<LlmCompletion> {
            Ok(LlmCompletion {
                text: serde_json::json!({
                    "overall_score": 5.0,
                    "competency_scores": {},
                    "strengths": [],
                    "weaknesses": [],
                    "question_assessments": []
                })
                .to_string(),
                model: "gpt-4.1".to_string(),
                prompt_tokens: 10,
                completion_tokens: 5,
            })
        }
    }

    fn make_thread() -> WorkflowThread {
        let mut thread = WorkflowThread::new("room-1", "https://meet.example/room-1");
        thread.transcript_text = Some("[t] Bot: Hi?\n[t] Participant 1: Hello.\n".to_string());
        thread.workflow_paused = true;
        thread
    }

    #[tokio::test]
    async fn missing_checkpoint_falls_back_and_clears_nothing_extra() {
        let store = PailflowStore::open_in_memory(None).unwrap();
        let users = UserStore::new(Connection::open_in_memory().unwrap()).unwrap();
        let transactions = TransactionStore::new(Connection::open_in_memory().unwrap()).unwrap();
        let checkpointer = InMemoryCheckpointStore::new();
        let client = reqwest::Client::new();

        let thread = make_thread();
        let id = thread.workflow_thread_id.clone();
        store.workflow_threads.create(&thread).unwrap();

        let ctx = ResumeContext {
            store: &store,
            users: &users,
            transactions: &transactions,
            llm: &StubLlm,
            http_client: &client,
            email_sender: None,
            rate_per_minute: 0.15,
        };

        resume_or_fallback(&checkpointer, &ctx, &id).await.unwrap();

        let updated = store.workflow_threads.get(&id).unwrap().unwrap();
        assert!(updated.transcript_processed);
    }

    #[tokio::test]
    async fn present_checkpoint_resumes_and_clears_paused_flag() {
        let store = PailflowStore::open_in_memory(None).unwrap();
        let users = UserStore::new(Connection::open_in_memory().unwrap()).unwrap();
        let transactions = TransactionStore::new(Connection::open_in_memory().unwrap()).unwrap();
        let checkpointer = InMemoryCheckpointStore::new();
        let client = reqwest::Client::new();

        let thread = make_thread();
        let id = thread.workflow_thread_id.clone();
        store.workflow_threads.create(&thread).unwrap();
        checkpointer
            .save(&id, serde_json::json!({"workflow_thread_id": id.as_str()}))
            .unwrap();

        let ctx = ResumeContext {
            store: &store,
            users: &users,
            transactions: &transactions,
            llm: &StubLlm,
            http_client: &client,
            email_sender: None,
            rate_per_minute: 0.15,
        };

        resume_or_fallback(&checkpointer, &ctx, &id).await.unwrap();

        let updated = store.workflow_threads.get(&id).unwrap().unwrap();
        assert!(updated.transcript_processed);
        assert!(!updated.workflow_paused);
    }
}
