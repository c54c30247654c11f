pub mod config;
pub mod crypto;
pub mod error;
pub mod types;

pub use config::PailflowConfig;
pub use error::{PailflowError, Result};
pub use types::{
    BotId, BotSession, BotSessionStatus, CheckpointId, Insights, MeetingStatus, QaPair,
    QuestionAssessment, TranscriptLine, UsageStats, WorkflowThread, WorkflowThreadId,
};
