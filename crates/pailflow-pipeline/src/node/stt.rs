use async_trait::async_trait;
use tokio::sync::mpsc::Sender;

use crate::error::Result;
use crate::frame::Frame;
use crate::node::PipelineNode;

/// One transcribed chunk from the speech-to-text provider.
#[derive(Debug, Clone)]
pub struct SttResult {
    pub text: String,
    pub is_final: bool,
    pub speaker_id: Option<String>,
}

/// Speech-to-text provider abstraction. `pailflow-pipeline` only defines
/// the seam — wiring a real vendor SDK is out of scope per spec.md §1
/// ("opaque strings, no vendor SDK wiring").
#[async_trait]
pub trait SttEngine: Send + Sync {
    async fn transcribe(&self, pcm: &[u8]) -> Option<SttResult>;
}

/// `stt` node: diarization on, utterance mode on (spec.md §4.2). Emits
/// `UserTranscription` carrying `speaker_id` whenever diarization reports
/// one.
pub struct SttNode {
    engine: std::sync::Arc<dyn SttEngine>,
}

impl SttNode {
    pub fn new(engine: std::sync::Arc<dyn SttEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl PipelineNode for SttNode {
    async fn process(&mut self, frame: Frame, tx: &Sender<Frame>) -> Result<()> {
        let Frame::AudioIn { pcm } = frame else {
            let _ = tx.send(frame).await;
            return Ok(());
        };

        if let Some(result) = self.engine.transcribe(&pcm).await {
            let _ = tx
                .send(Frame::UserTranscription {
                    text: result.text,
                    is_final: result.is_final,
                    speaker_id: result.speaker_id,
                    user_id: None,
                })
                .await;
        }
        Ok(())
    }
}
