use pailflow_core::error::PailflowError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("store error: {0}")]
    Store(#[from] pailflow_store::StoreError),
    #[error("no placement backend is configured")]
    PlacementUnavailable,
    #[error("placement failed: {0}")]
    PlacementFailed(String),
    #[error("pipeline error: {0}")]
    Pipeline(#[from] pailflow_pipeline::PipelineError),
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;

impl From<OrchestratorError> for PailflowError {
    fn from(e: OrchestratorError) -> Self {
        match e {
            OrchestratorError::Store(err) => err.into(),
            OrchestratorError::Pipeline(err) => err.into(),
            OrchestratorError::PlacementUnavailable => {
                PailflowError::PlacementFailed("no placement backend is configured".to_string())
            }
            OrchestratorError::PlacementFailed(cause) => PailflowError::PlacementFailed(cause),
        }
    }
}
