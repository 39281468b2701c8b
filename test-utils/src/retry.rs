//! Rate-limit-aware retry wrapper for integration tests.

use std::time::Duration;

/// Exponential backoff configuration for test retries. Mirrors the engine's
/// production retry policy (base 1s, factor 2, max 60s) so tests exercise
/// the same cadence they'll see in production.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,
    /// Initial backoff duration.
    pub initial_backoff: Duration,
    /// Backoff ceiling.
    pub max_backoff: Duration,
    /// Backoff multiplier applied after each failed attempt.
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
            multiplier: 2.0,
        }
    }
}

/// Retry `f` while its error looks like a vendor rate-limit response.
pub async fn with_rate_limit_retry<F, Fut, T, E>(config: RetryConfig, mut f: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempts = 0;
    let mut backoff = config.initial_backoff;

    loop {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                let msg = e.to_string().to_lowercase();
                let is_rate_limited =
                    msg.contains("rate_limited") || msg.contains("429") || msg.contains("retry");

                if !is_rate_limited || attempts >= config.max_retries {
                    return Err(e);
                }

                attempts += 1;
                tokio::time::sleep(backoff).await;
                backoff = Duration::from_secs_f64(
                    (backoff.as_secs_f64() * config.multiplier)
                        .min(config.max_backoff.as_secs_f64()),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_until_success() {
        let attempts = AtomicU32::new(0);
        let config = RetryConfig {
            max_retries: 3,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(4),
            multiplier: 2.0,
        };

        let result: Result<u32, String> = with_rate_limit_retry(config, || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err("RATE_LIMITED".to_string())
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(42));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_non_rate_limit_errors() {
        let attempts = AtomicU32::new(0);
        let result: Result<u32, String> = with_rate_limit_retry(RetryConfig::default(), || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async move { Err::<u32, _>("INPUT_INVALID".to_string()) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
