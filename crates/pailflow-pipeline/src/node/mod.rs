mod animation;
mod assistant_aggregator;
mod llm;
mod metrics_tap;
mod speaker_tracker;
mod stt;
mod transcript_assistant;
mod transcript_user;
mod transport_in;
mod transport_out;
mod tts;
mod user_aggregator;

pub use animation::{build_animation_sequence, AnimationNode};
pub use assistant_aggregator::AssistantAggregatorNode;
pub use llm::{LlmEngine, LlmNode, LlmReply};
pub use metrics_tap::MetricsTapNode;
pub use speaker_tracker::SpeakerTrackerNode;
pub use stt::{SttEngine, SttNode, SttResult};
pub use transcript_assistant::TranscriptAssistantNode;
pub use transcript_user::TranscriptUserNode;
pub use transport_in::TransportInNode;
pub use transport_out::{RoomRenderer, TransportOutNode};
pub use tts::{TtsEngine, TtsNode};
pub use user_aggregator::UserAggregatorNode;

use async_trait::async_trait;
use tokio::sync::mpsc::Sender;

use crate::error::Result;
use crate::frame::Frame;

/// One stage of the media pipeline topology (spec.md §4.2). Generalizes
/// `skynet_hooks::engine::HookEngine::emit_before`/`emit_after`'s "ordered
/// handlers over one event" idea to a fixed linear chain, since the
/// topology here is static rather than a registered list.
#[async_trait]
pub trait PipelineNode: Send {
    /// Consume one inbound frame, optionally emitting zero or more
    /// downstream frames on `tx`.
    async fn process(&mut self, frame: Frame, tx: &Sender<Frame>) -> Result<()>;

    /// Periodic tick for nodes that debounce on wall-clock time rather than
    /// frame arrival (e.g. `user_aggregator`'s aggregation/VAD timeouts).
    /// No-op for nodes that are purely frame-driven.
    async fn tick(&mut self, _tx: &Sender<Frame>) -> Result<()> {
        Ok(())
    }
}
