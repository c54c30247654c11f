use std::sync::Arc;

use async_trait::async_trait;
use pailflow_core::types::WorkflowThreadId;
use pailflow_pricing::calculate_llm_cost;
use pailflow_store::PailflowStore;
use pailflow_usage::update_workflow_usage_cost;
use tokio::sync::mpsc::Sender;
use tracing::warn;

use crate::error::Result;
use crate::frame::Frame;
use crate::node::PipelineNode;

/// Observes `MetricsLLMUsage` frames, prices them, and feeds the cost to
/// the Usage Tracker (spec.md §4.2 "metrics_tap", §4.6). A pure passthrough
/// otherwise — every frame, including the ones it taps, continues
/// downstream unchanged.
pub struct MetricsTapNode {
    store: Arc<PailflowStore>,
    workflow_thread_id: WorkflowThreadId,
}

impl MetricsTapNode {
    pub fn new(store: Arc<PailflowStore>, workflow_thread_id: WorkflowThreadId) -> Self {
        Self {
            store,
            workflow_thread_id,
        }
    }
}

#[async_trait]
impl PipelineNode for MetricsTapNode {
    async fn process(&mut self, frame: Frame, tx: &Sender<Frame>) -> Result<()> {
        if let Frame::MetricsLLMUsage {
            ref model,
            prompt_tokens,
            completion_tokens,
        } = frame
        {
            match calculate_llm_cost(model, prompt_tokens as u64, completion_tokens as u64) {
                Ok(cost) => {
                    if let Err(err) =
                        update_workflow_usage_cost(&self.store, &self.workflow_thread_id, cost, None)
                    {
                        warn!(error = %err, "failed to record llm usage cost");
                    }
                }
                Err(err) => warn!(error = %err, model, "could not price llm usage"),
            }
        }
        let _ = tx.send(frame).await;
        Ok(())
    }
}
