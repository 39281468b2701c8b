//! Error types for QuestFlow observability.

use thiserror::Error;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid tracing configuration: {0}")]
    ConfigurationError(String),

    #[error("metrics operation failed: {0}")]
    Metrics(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_error_display() {
        let err = Error::ConfigurationError("invalid sampling rate".to_string());
        assert_eq!(err.to_string(), "invalid tracing configuration: invalid sampling rate");
    }

    #[test]
    fn metrics_error_display() {
        let err = Error::Metrics("counter overflow".to_string());
        assert_eq!(err.to_string(), "metrics operation failed: counter overflow");
    }
}
