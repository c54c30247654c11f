use pailflow_core::error::PailflowError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PostCallError {
    #[error("store error: {0}")]
    Store(#[from] pailflow_store::StoreError),
    #[error("usage error: {0}")]
    Usage(#[from] pailflow_usage::UsageError),
    #[error("pricing error: {0}")]
    Pricing(#[from] pailflow_pricing::PricingError),
    #[error("llm call failed: {0}")]
    Llm(String),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PostCallError>;

impl From<PostCallError> for PailflowError {
    fn from(e: PostCallError) -> Self {
        match e {
            PostCallError::Store(err) => err.into(),
            PostCallError::Usage(err) => err.into(),
            PostCallError::Pricing(_) => PailflowError::Internal(e.to_string()),
            other => PailflowError::SideEffect(other.to_string()),
        }
    }
}
