use pailflow_core::error::PailflowError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("pipeline channel closed")]
    ChannelClosed,
    #[error("stt error: {0}")]
    Stt(String),
    #[error("llm error: {0}")]
    Llm(String),
    #[error("tts error: {0}")]
    Tts(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error(transparent)]
    Store(#[from] pailflow_store::StoreError),
    #[error(transparent)]
    Usage(#[from] pailflow_usage::UsageError),
    #[error(transparent)]
    Pricing(#[from] pailflow_pricing::PricingError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

impl From<PipelineError> for PailflowError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Store(e) => e.into(),
            PipelineError::Usage(e) => e.into(),
            PipelineError::Pricing(_) => PailflowError::Internal(err.to_string()),
            other => PailflowError::BotRuntime(other.to_string()),
        }
    }
}
