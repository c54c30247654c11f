use async_trait::async_trait;
use pailflow_core::types::{WorkflowThread, WorkflowThreadId};
use pailflow_store::{CheckpointStore, PailflowStore};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, instrument, warn};

use crate::error::{Result, WorkflowError};

/// What `join_bot` needs from the Bot Session Orchestrator, without this
/// crate depending on `pailflow-orchestrator` — the same seam-trait shape
/// `pailflow_pipeline::context::WorkflowResumer` uses for the reverse
/// direction.
#[async_trait]
pub trait BotStarter: Send + Sync {
    async fn start_bot(
        &self,
        room_name: &str,
        room_url: &str,
        token: &str,
        bot_config: &Map<String, Value>,
        workflow_thread_id: &str,
    ) -> std::result::Result<(), String>;
}

/// The graph's carried state, checkpointed at each node boundary (spec.md
/// §4.3 "State").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowState {
    pub room_url: String,
    pub token: String,
    pub room_name: String,
    pub bot_config: Map<String, Value>,
    pub bot_id: Option<String>,
    pub workflow_thread_id: String,
    pub transcript_text: Option<String>,
    pub error: Option<String>,
}

/// Where the engine currently sits between the two nodes (spec.md §4.3
/// "Graph"). An explicit enum rather than a generic executor — this graph
/// only ever has two nodes and one interrupt point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowPhase {
    AwaitingJoin,
    Paused,
    Completed,
    Failed,
}

/// Runs the `join_bot` node: records the thread, starts the bot, checkpoints
/// state, and stops — the static interrupt before `process_transcript`
/// (spec.md §4.3).
#[instrument(skip(starter, store, checkpointer, token, bot_config), fields(room_name))]
pub async fn join_bot(
    starter: &dyn BotStarter,
    store: &PailflowStore,
    checkpointer: &dyn CheckpointStore,
    room_name: &str,
    room_url: &str,
    token: &str,
    bot_config: Map<String, Value>,
    workflow_thread_id: Option<WorkflowThreadId>,
) -> Result<(WorkflowThreadId, WorkflowPhase)> {
    let thread_id = workflow_thread_id.unwrap_or_else(WorkflowThreadId::new);

    let mut thread = match store.workflow_threads.get(&thread_id)? {
        Some(existing) => existing,
        None => {
            let mut fresh = WorkflowThread::new(room_name, room_url);
            fresh.workflow_thread_id = thread_id.clone();
            store.workflow_threads.create(&fresh)?;
            fresh
        }
    };
    thread.bot_config = bot_config.clone();
    thread.workflow_paused = true;
    store.workflow_threads.update(&thread)?;

    let mut state = WorkflowState {
        room_url: room_url.to_string(),
        token: token.to_string(),
        room_name: room_name.to_string(),
        bot_config,
        bot_id: thread.bot_id.as_ref().map(|id| id.to_string()),
        workflow_thread_id: thread_id.as_str().to_string(),
        transcript_text: None,
        error: None,
    };

    let phase = match starter
        .start_bot(room_name, room_url, token, &state.bot_config, thread_id.as_str())
        .await
    {
        Ok(()) => WorkflowPhase::Paused,
        Err(err) => {
            warn!(error = %err, "join_bot: start_bot failed, recording state.error");
            state.error = Some(err);
            WorkflowPhase::Failed
        }
    };

    let checkpoint_id = checkpointer.save(&thread_id, serde_json::to_value(&state)?)?;
    thread.checkpoint_id = Some(checkpoint_id);
    store.workflow_threads.update(&thread)?;

    info!(workflow_thread_id = %thread_id, ?phase, "join_bot checkpointed");
    Ok((thread_id, phase))
}
