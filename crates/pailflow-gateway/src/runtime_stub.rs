//! Vendor seams this core deliberately leaves unimplemented (out of scope
//! per spec.md §1: the STT/LLM/TTS vendor SDKs themselves). A deployment
//! wires its own [`SessionRuntime`]/[`InsightsLlm`] behind these traits;
//! the stubs here let the gateway binary start and exercise every other
//! code path without a real media/LLM backend configured.

use async_trait::async_trait;
use pailflow_orchestrator::{SessionRequest, SessionRuntime};
use pailflow_pipeline::{PipelineContext, Result as PipelineResult};
use pailflow_postcall::insights::{InsightsLlm, LlmCompletion};
use pailflow_postcall::{PostCallError, Result as PostCallResult};
use tracing::warn;

/// Reports unavailable immediately rather than attempting a real session —
/// `BotWorker::run_to_completion` still runs the shutdown sequence on this
/// path, so a bot placed with no runtime configured leaves cleanly.
pub struct NullSessionRuntime;

#[async_trait]
impl SessionRuntime for NullSessionRuntime {
    async fn run(&self, request: SessionRequest, _ctx: PipelineContext) -> PipelineResult<()> {
        warn!(
            room_name = %request.room_name,
            "no SessionRuntime configured — skipping media pipeline"
        );
        Ok(())
    }
}

/// Always fails, which sends `extract_insights` down the placeholder-insights
/// fallback path (spec.md §4.4 step 3) rather than blocking post-call work.
pub struct NullInsightsLlm;

#[async_trait]
impl InsightsLlm for NullInsightsLlm {
    async fn complete_json(&self, _prompt: &str) -> PostCallResult<LlmCompletion> {
        Err(PostCallError::Llm("no InsightsLlm configured".to_string()))
    }
}
