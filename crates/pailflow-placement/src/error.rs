use pailflow_core::error::PailflowError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlacementError {
    #[error("placement backend unavailable: {0}")]
    Unavailable(String),
    #[error("placement failed: {0}")]
    Failed(String),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PlacementError>;

impl From<PlacementError> for PailflowError {
    fn from(e: PlacementError) -> Self {
        match e {
            PlacementError::Unavailable(detail) => PailflowError::PlacementFailed(detail),
            other => PailflowError::PlacementFailed(other.to_string()),
        }
    }
}
