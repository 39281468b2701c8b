//! Configuration for structured logging output.

use serde::{Deserialize, Serialize};

/// Output format for the process-wide `tracing` subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LogFormat {
    /// Human-readable, for local development.
    #[default]
    Pretty,
    /// Newline-delimited JSON, for ingestion by a log pipeline.
    Json,
}

/// Configuration for the workflow engine's logging layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Identifies this process in every emitted log line.
    pub service_name: String,
    /// Output format.
    pub format: LogFormat,
    /// Overrides `RUST_LOG` when set; otherwise the env var wins.
    pub default_filter: String,
}

impl LoggingConfig {
    #[must_use]
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            format: LogFormat::Pretty,
            default_filter: "info".to_string(),
        }
    }

    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_default_filter(mut self, filter: impl Into<String>) -> Self {
        self.default_filter = filter.into();
        self
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::new("questflow")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_pretty_at_info() {
        let config = LoggingConfig::default();
        assert_eq!(config.service_name, "questflow");
        assert_eq!(config.format, LogFormat::Pretty);
        assert_eq!(config.default_filter, "info");
    }

    #[test]
    fn builder_overrides_format_and_filter() {
        let config = LoggingConfig::new("questflow-cli")
            .with_format(LogFormat::Json)
            .with_default_filter("debug");
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.default_filter, "debug");
    }
}
