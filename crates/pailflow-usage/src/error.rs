use thiserror::Error;

#[derive(Debug, Error)]
pub enum UsageError {
    #[error("workflow thread not found: {0}")]
    ThreadNotFound(String),

    #[error("user not found for unkey id: {0}")]
    UserNotFound(String),

    #[error("pricing error: {0}")]
    Pricing(#[from] pailflow_pricing::PricingError),

    #[error("store error: {0}")]
    Store(#[from] pailflow_store::StoreError),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, UsageError>;

impl From<UsageError> for pailflow_core::PailflowError {
    fn from(e: UsageError) -> Self {
        match e {
            UsageError::ThreadNotFound(id) => {
                pailflow_core::PailflowError::Validation(format!("workflow thread not found: {id}"))
            }
            other => pailflow_core::PailflowError::Internal(other.to_string()),
        }
    }
}
