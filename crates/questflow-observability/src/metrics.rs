//! Process-wide Prometheus metrics registry.
//!
//! A single global-singleton registry, reached via [`metrics_registry`],
//! scoped to the phase/activity counters this engine actually emits.

use std::sync::OnceLock;

use prometheus::{Histogram, HistogramOpts, IntCounterVec, Opts, Registry};

use crate::error::{Error, Result};

/// Named Prometheus collectors for the workflow engine.
pub struct MetricsRegistry {
    registry: Registry,
    pub phase_duration_seconds: Histogram,
    pub phase_retry_total: IntCounterVec,
    pub soft_skip_total: IntCounterVec,
    pub vendor_call_total: IntCounterVec,
}

impl MetricsRegistry {
    fn new() -> Result<Self> {
        let registry = Registry::new();

        let phase_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "questflow_phase_duration_seconds",
            "Wall-clock duration of a completed phase execution",
        ))
        .map_err(|e| Error::Metrics(e.to_string()))?;

        let phase_retry_total = IntCounterVec::new(
            Opts::new("questflow_phase_retry_total", "Retry attempts issued by phase"),
            &["phase"],
        )
        .map_err(|e| Error::Metrics(e.to_string()))?;

        let soft_skip_total = IntCounterVec::new(
            Opts::new("questflow_soft_skip_total", "Dependency-class soft-skips recorded"),
            &["dependency"],
        )
        .map_err(|e| Error::Metrics(e.to_string()))?;

        let vendor_call_total = IntCounterVec::new(
            Opts::new("questflow_vendor_call_total", "Outbound adapter calls by vendor and outcome"),
            &["vendor", "outcome"],
        )
        .map_err(|e| Error::Metrics(e.to_string()))?;

        registry
            .register(Box::new(phase_duration_seconds.clone()))
            .map_err(|e| Error::Metrics(e.to_string()))?;
        registry
            .register(Box::new(phase_retry_total.clone()))
            .map_err(|e| Error::Metrics(e.to_string()))?;
        registry
            .register(Box::new(soft_skip_total.clone()))
            .map_err(|e| Error::Metrics(e.to_string()))?;
        registry
            .register(Box::new(vendor_call_total.clone()))
            .map_err(|e| Error::Metrics(e.to_string()))?;

        Ok(Self { registry, phase_duration_seconds, phase_retry_total, soft_skip_total, vendor_call_total })
    }

    /// The process-wide registry, created on first access.
    pub fn global() -> &'static MetricsRegistry {
        static INSTANCE: OnceLock<MetricsRegistry> = OnceLock::new();
        INSTANCE.get_or_init(|| MetricsRegistry::new().expect("metrics registration is infallible for static opts"))
    }

    /// Render all registered metrics in the Prometheus text exposition
    /// format, for a caller-owned scrape endpoint (this crate does not
    /// itself expose an HTTP surface — that belongs to the outer gateway).
    pub fn export(&self) -> Result<String> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).map_err(|e| Error::Metrics(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| Error::Metrics(e.to_string()))
    }
}

/// Convenience accessor for the global registry.
pub fn metrics_registry() -> &'static MetricsRegistry {
    MetricsRegistry::global()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_registry_exports_registered_metric_names() {
        let registry = MetricsRegistry::global();
        registry.phase_retry_total.with_label_values(&["synthesize"]).inc();
        registry.vendor_call_total.with_label_values(&["tavily", "success"]).inc();

        let text = registry.export().unwrap();
        assert!(text.contains("questflow_phase_retry_total"));
        assert!(text.contains("questflow_vendor_call_total"));
    }
}
