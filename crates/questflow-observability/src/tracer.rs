//! Trait for automatic span instrumentation of async operations.

use async_trait::async_trait;
use std::future::Future;

/// Wraps async operations in a `tracing` span, a convenience for
/// instrumenting adapter calls without hand-writing the span at each
/// call site.
#[async_trait]
pub trait Traceable {
    async fn execute_traced<F, T>(&self, operation: &str, f: F) -> T
    where
        F: Future<Output = T> + Send,
        T: Send;
}

/// Wrap an expression in an `info_span` with the given name and fields.
#[macro_export]
macro_rules! traced_span {
    ($name:expr, $body:expr) => {{
        use tracing::Instrument;
        let span = tracing::info_span!($name);
        async move { $body }.instrument(span).await
    }};
    ($name:expr, $($key:ident = $value:expr),+ , $body:expr) => {{
        use tracing::Instrument;
        let span = tracing::info_span!($name, $($key = $value),+);
        async move { $body }.instrument(span).await
    }};
}

#[cfg(test)]
mod tests {
    #[tokio::test]
    async fn traced_span_runs_body_and_returns_value() {
        let result = traced_span!("test.op", phase = "research", async { 21 + 21 });
        assert_eq!(result, 42);
    }
}
