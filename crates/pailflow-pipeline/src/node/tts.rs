use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc::Sender;

use crate::error::Result;
use crate::frame::Frame;
use crate::node::PipelineNode;

/// Text-to-speech provider abstraction. Vendor SDK wiring is out of scope
/// per spec.md §1.
#[async_trait]
pub trait TtsEngine: Send + Sync {
    async fn synthesize(&self, text: &str) -> crate::error::Result<Vec<u8>>;
}

/// `tts` node: brackets synthesized audio with `BotStartedSpeaking` /
/// `BotStoppedSpeaking` (spec.md §4.2 "tts").
pub struct TtsNode {
    engine: Arc<dyn TtsEngine>,
}

impl TtsNode {
    pub fn new(engine: Arc<dyn TtsEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl PipelineNode for TtsNode {
    async fn process(&mut self, frame: Frame, tx: &Sender<Frame>) -> Result<()> {
        let Frame::AssistantTranscription { ref text, .. } = frame else {
            let _ = tx.send(frame).await;
            return Ok(());
        };

        let pcm = self.engine.synthesize(text).await?;
        let _ = tx.send(Frame::BotStartedSpeaking).await;
        let _ = tx.send(Frame::AudioOut { pcm }).await;
        let _ = tx.send(Frame::BotStoppedSpeaking).await;
        let _ = tx.send(frame).await;
        Ok(())
    }
}
