use thiserror::Error;

/// Top-level error taxonomy shared across the workspace.
///
/// Each crate keeps its own narrower error type and converts into this one
/// at its public boundary — mirrors how `skynet-sessions::SessionError` and
/// `skynet-scheduler::SchedulerError` stay local while the gateway only
/// ever sees one shape.
#[derive(Debug, Error)]
pub enum PailflowError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("placement failed: {0}")]
    PlacementFailed(String),

    #[error("bot runtime error: {0}")]
    BotRuntime(String),

    #[error("native shutdown warning: {0}")]
    NativeShutdown(String),

    #[error("checkpoint missing for thread {thread_id}: {detail}")]
    CheckpointMissing { thread_id: String, detail: String },

    #[error("LLM returned unparsable insights: {0}")]
    LlmParse(String),

    #[error("side effect failed: {0}")]
    SideEffect(String),

    #[error("insufficient credits: balance {balance}")]
    InsufficientCredits { balance: f64 },

    #[error("database error: {0}")]
    Database(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl PailflowError {
    /// Short error code used in the `{error, detail, message}` HTTP body (spec.md §6/§7).
    pub fn code(&self) -> &'static str {
        match self {
            PailflowError::Validation(_) => "VALIDATION_ERROR",
            PailflowError::PlacementFailed(_) => "PLACEMENT_FAILED",
            PailflowError::BotRuntime(_) => "BOT_RUNTIME_ERROR",
            PailflowError::NativeShutdown(_) => "NATIVE_SHUTDOWN",
            PailflowError::CheckpointMissing { .. } => "CHECKPOINT_MISSING",
            PailflowError::LlmParse(_) => "LLM_PARSE_ERROR",
            PailflowError::SideEffect(_) => "SIDE_EFFECT_ERROR",
            PailflowError::InsufficientCredits { .. } => "INSUFFICIENT_CREDITS",
            PailflowError::Database(_) => "DATABASE_ERROR",
            PailflowError::Config(_) => "CONFIG_ERROR",
            PailflowError::Serialization(_) => "SERIALIZATION_ERROR",
            PailflowError::Io(_) => "IO_ERROR",
            PailflowError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, PailflowError>;
