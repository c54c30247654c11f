use pailflow_core::error::PailflowError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("store error: {0}")]
    Store(#[from] pailflow_store::StoreError),
    #[error("post-call pipeline error: {0}")]
    PostCall(#[from] pailflow_postcall::PostCallError),
    #[error("bot start failed: {0}")]
    BotStart(String),
    #[error("checkpoint missing for thread {thread_id}: possible causes: in-memory store across restarts, misconfigured DB, expired/deleted checkpoint")]
    CheckpointMissing { thread_id: String },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, WorkflowError>;

impl From<WorkflowError> for PailflowError {
    fn from(e: WorkflowError) -> Self {
        match e {
            WorkflowError::Store(err) => err.into(),
            WorkflowError::PostCall(err) => err.into(),
            WorkflowError::CheckpointMissing { thread_id } => PailflowError::CheckpointMissing {
                thread_id,
                detail: "possible causes: in-memory store across restarts, misconfigured DB, expired/deleted checkpoint".to_string(),
            },
            other => PailflowError::SideEffect(other.to_string()),
        }
    }
}
