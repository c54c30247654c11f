use thiserror::Error;

#[derive(Debug, Error)]
pub enum PricingError {
    #[error("duration must be non-negative, got {0}s")]
    NegativeDuration(i64),

    #[error("model '{0}' not found in MODEL_RATES")]
    UnknownModel(String),
}

pub type Result<T> = std::result::Result<T, PricingError>;
