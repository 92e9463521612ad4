//! Runtime error types

use fadec_core::FadecError;

/// Errors from the real-time driver
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("Invalid runtime configuration: {0}")]
    Configuration(FadecError),

    #[error("Intent rejected: {0}")]
    Rejected(FadecError),

    #[error("Engine runtime is not running")]
    Stopped,
}

/// Errors from a status advisor
#[derive(Debug, thiserror::Error)]
pub enum AdvisorError {
    #[error("Advisor unavailable: {0}")]
    Unavailable(String),

    #[error("Advisor returned an empty response")]
    EmptyResponse,

    #[error("Advisor response malformed: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Advisor timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl From<FadecError> for RuntimeError {
    fn from(err: FadecError) -> Self {
        RuntimeError::Configuration(err)
    }
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
