//! Error types for the engine simulation core

/// Errors raised at the intent and configuration boundary.
///
/// The tick itself never fails; everything here is rejected before it can
/// reach simulation state.
#[derive(Debug, thiserror::Error)]
pub enum FadecError {
    #[error("Unknown failure id: {0}")]
    UnknownFailure(String),

    #[error("Unknown suppression bottle: {0}")]
    UnknownBottle(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid scenario: {0}")]
    InvalidScenario(String),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("File system error: {0}")]
    Io(#[from] std::io::Error),
}

impl FadecError {
    /// Shorthand for a configuration rejection
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration(message.into())
    }
}

/// Result alias used throughout the core crate
pub type Result<T> = std::result::Result<T, FadecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_context() {
        let err = FadecError::UnknownFailure("hydraulicLeak".to_string());
        assert!(err.to_string().contains("hydraulicLeak"));

        let err = FadecError::configuration("tick_period_ms must be greater than 0");
        assert!(err.to_string().starts_with("Invalid configuration"));
    }
}
