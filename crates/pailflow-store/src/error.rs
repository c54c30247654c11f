use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("workflow thread not found: {0}")]
    ThreadNotFound(String),

    #[error("bot session not found: {0}")]
    BotSessionNotFound(String),

    #[error("checkpoint not found: {0}")]
    CheckpointNotFound(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("field encryption error: {0}")]
    Encryption(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl From<StoreError> for pailflow_core::PailflowError {
    fn from(e: StoreError) -> Self {
        pailflow_core::PailflowError::Database(e.to_string())
    }
}

impl From<pailflow_core::PailflowError> for StoreError {
    fn from(e: pailflow_core::PailflowError) -> Self {
        StoreError::Encryption(e.to_string())
    }
}
