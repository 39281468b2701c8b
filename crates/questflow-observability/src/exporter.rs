//! Process-wide `tracing` subscriber initialization.

use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{LogFormat, LoggingConfig};
use crate::error::{Error, Result};

/// Install the global `tracing` subscriber. Call once, at process start.
///
/// `RUST_LOG` overrides `config.default_filter` when set, following the
/// usual `tracing-subscriber` convention.
pub fn init_tracing(config: LoggingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_filter.clone()));

    let registry = tracing_subscriber::registry().with(env_filter);

    let result = match config.format {
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init(),
    };

    result.map_err(|e| Error::ConfigurationError(e.to_string()))?;
    tracing::info!(service = %config.service_name, format = ?config.format, "tracing initialized");
    Ok(())
}
