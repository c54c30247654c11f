use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::mpsc::Sender;

use crate::error::Result;
use crate::frame::Frame;
use crate::node::PipelineNode;

/// Default aggregation timeout, raised from the STT service's 0.5s default
/// to avoid mid-utterance LLM invocations (spec.md §4.2 "user_aggregator").
pub const DEFAULT_AGGREGATION_TIMEOUT: Duration = Duration::from_millis(1000);
/// Default emulated-VAD timeout. Emulated-VAD interruptions stay disabled
/// here — only an explicit interruption strategy (handled upstream of this
/// node) can interrupt the bot.
pub const DEFAULT_VAD_TIMEOUT: Duration = Duration::from_millis(1000);

/// Buffers partial STT transcripts and flushes into one aggregated
/// `UserTranscription` + `LLMRun` pair once both the aggregation timeout
/// and the emulated-VAD timeout have elapsed since the last partial
/// (spec.md §4.2 "user_aggregator").
pub struct UserAggregatorNode {
    aggregation_timeout: Duration,
    vad_timeout: Duration,
    buffer: String,
    last_partial_at: Option<Instant>,
    speaker_id: Option<String>,
    user_id: Option<String>,
}

impl UserAggregatorNode {
    pub fn new(aggregation_timeout: Duration, vad_timeout: Duration) -> Self {
        Self {
            aggregation_timeout,
            vad_timeout,
            buffer: String::new(),
            last_partial_at: None,
            speaker_id: None,
            user_id: None,
        }
    }

    fn ready_to_flush(&self) -> bool {
        let Some(last) = self.last_partial_at else {
            return false;
        };
        let longest = self.aggregation_timeout.max(self.vad_timeout);
        last.elapsed() >= longest
    }

    async fn flush(&mut self, tx: &Sender<Frame>) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let text = std::mem::take(&mut self.buffer);
        let _ = tx
            .send(Frame::UserTranscription {
                text,
                is_final: true,
                speaker_id: self.speaker_id.take(),
                user_id: self.user_id.take(),
            })
            .await;
        let _ = tx.send(Frame::LLMRun).await;
        self.last_partial_at = None;
        Ok(())
    }
}

#[async_trait]
impl PipelineNode for UserAggregatorNode {
    async fn process(&mut self, frame: Frame, tx: &Sender<Frame>) -> Result<()> {
        let Frame::UserTranscription {
            text,
            speaker_id,
            user_id,
            ..
        } = frame
        else {
            let _ = tx.send(frame).await;
            return Ok(());
        };

        self.buffer.push_str(&text);
        self.last_partial_at = Some(Instant::now());
        if speaker_id.is_some() {
            self.speaker_id = speaker_id;
        }
        if user_id.is_some() {
            self.user_id = user_id;
        }
        Ok(())
    }

    async fn tick(&mut self, tx: &Sender<Frame>) -> Result<()> {
        if self.ready_to_flush() {
            self.flush(tx).await?;
        }
        Ok(())
    }
}
