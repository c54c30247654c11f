pub mod checkpointer;
pub mod error;
pub mod graph;
pub mod resume;

pub use checkpointer::{CheckpointRecord, CheckpointStore};
pub use error::{Result, WorkflowError};
pub use graph::{join_bot, BotStarter, WorkflowPhase, WorkflowState};
pub use resume::{resume_or_fallback, ResumeContext};
