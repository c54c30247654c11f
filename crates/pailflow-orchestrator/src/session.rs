use std::time::Instant;

use async_trait::async_trait;
use pailflow_core::types::WorkflowThreadId;
use pailflow_pipeline::{PipelineContext, Result as PipelineResult};
use serde_json::{Map, Value};

/// What a placement backend hands to a worker (mirrors
/// `pailflow_placement::in_process::SpawnRequest`, duplicated here so this
/// crate doesn't need to depend on `pailflow-placement`'s internal request
/// shape for every backend).
#[derive(Debug, Clone)]
pub struct SessionRequest {
    pub room_name: String,
    pub room_url: String,
    pub token: String,
    pub bot_config: Map<String, Value>,
    pub workflow_thread_id: WorkflowThreadId,
}

/// Runs one bot session's Media Pipeline to completion. Assembling the
/// concrete node topology (stt/llm/tts/transport, §4.2) means wiring real
/// vendor SDKs, which is explicitly out of this core's scope (spec.md §1) —
/// this trait is the seam a deployment plugs its own pipeline builder into.
/// `BotWorker` only owns what's left: shutdown sequencing around the run.
#[async_trait]
pub trait SessionRuntime: Send + Sync {
    async fn run(&self, request: SessionRequest, ctx: PipelineContext) -> PipelineResult<()>;
}

/// One running (or recently running) session tracked by the orchestrator's
/// registry (spec.md §4.1 "registers a handle in the in-process registry
/// keyed by room name").
pub struct ActiveSession {
    pub backend_name: &'static str,
    pub handle: pailflow_placement::PlacementHandle,
    pub started_at: Instant,
    pub workflow_thread_id: WorkflowThreadId,
}

impl ActiveSession {
    pub fn runtime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
