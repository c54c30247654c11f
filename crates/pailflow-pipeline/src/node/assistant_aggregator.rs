use async_trait::async_trait;
use tokio::sync::mpsc::Sender;

use crate::error::Result;
use crate::frame::Frame;
use crate::node::PipelineNode;

/// Terminal stage of the topology. Nothing downstream consumes its output
/// in this design — it exists as the symmetric counterpart to
/// `user_aggregator` and as the sink the pipeline driver drains to detect
/// end-of-turn.
#[derive(Default)]
pub struct AssistantAggregatorNode;

#[async_trait]
impl PipelineNode for AssistantAggregatorNode {
    async fn process(&mut self, _frame: Frame, _tx: &Sender<Frame>) -> Result<()> {
        Ok(())
    }
}
