use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc::Sender;

use crate::error::Result;
use crate::frame::Frame;
use crate::node::PipelineNode;

/// Renders outbound media/image frames to the room. `pailflow-pipeline`
/// only defines the seam — the gateway wires in a real transport.
pub trait RoomRenderer: Send + Sync {
    fn render(&self, frame: &Frame);
}

/// `transport_out` node: renders `AudioOut` / `ImageOutput` / `AnimatedSprite`
/// frames to the room, then forwards them on for transcript bookkeeping
/// (spec.md §4.2 "transport_out").
pub struct TransportOutNode {
    renderer: Arc<dyn RoomRenderer>,
}

impl TransportOutNode {
    pub fn new(renderer: Arc<dyn RoomRenderer>) -> Self {
        Self { renderer }
    }
}

#[async_trait]
impl PipelineNode for TransportOutNode {
    async fn process(&mut self, frame: Frame, tx: &Sender<Frame>) -> Result<()> {
        if matches!(
            frame,
            Frame::AudioOut { .. } | Frame::ImageOutput { .. } | Frame::AnimatedSprite { .. }
        ) {
            self.renderer.render(&frame);
        }
        let _ = tx.send(frame).await;
        Ok(())
    }
}
