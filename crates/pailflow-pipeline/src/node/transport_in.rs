use async_trait::async_trait;
use tokio::sync::mpsc::Sender;

use crate::error::Result;
use crate::frame::Frame;
use crate::node::PipelineNode;

/// Entry point of the topology — forwards whatever the transport hands it
/// (audio, transport-level signals) unchanged to `stt`.
#[derive(Default)]
pub struct TransportInNode;

#[async_trait]
impl PipelineNode for TransportInNode {
    async fn process(&mut self, frame: Frame, tx: &Sender<Frame>) -> Result<()> {
        let _ = tx.send(frame).await;
        Ok(())
    }
}
