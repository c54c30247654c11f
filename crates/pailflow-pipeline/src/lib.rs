pub mod context;
pub mod error;
pub mod events;
pub mod frame;
pub mod node;
pub mod pipeline;
pub mod shutdown;
pub mod speaker;
pub mod transcript;

pub use context::{PipelineContext, RoomQuery, WorkflowResumer};
pub use error::{PipelineError, Result};
pub use frame::Frame;
pub use pipeline::Pipeline;
pub use speaker::SpeakerTracker;
pub use transcript::{Participant, Role, TranscriptHandler, TranscriptMessage};
