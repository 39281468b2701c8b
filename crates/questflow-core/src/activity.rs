//! The activity boundary: the only place non-determinism (network, time,
//! randomness) is allowed to live. Phases call activities; the engine
//! itself never talks to an external adapter directly.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::cancellation::CancellationToken;
use crate::error::QuestError;
use crate::retry::RetryPolicy;

/// A typed, side-effectful unit of work with its own timeout and retry
/// policy, independent of the phase that invokes it. External adapter
/// crates (search, research, crawler, llm, image, store, graph) implement
/// this for their vendor call.
#[async_trait]
pub trait Activity: Send + Sync {
    /// Input accepted by a single invocation.
    type Input: Send;
    /// Output produced on success.
    type Output: Send;

    /// Name used in logs, idempotency keys, and history records.
    fn name(&self) -> &str;

    /// Invoke the activity exactly once, with no retry or timeout wrapping
    /// — that's applied by [`run_with_retry`].
    async fn call(&self, input: Self::Input) -> crate::Result<Self::Output>;
}

/// Result of successfully running an activity to completion, including the
/// bookkeeping the engine needs for idempotency and audit.
#[derive(Debug, Clone)]
pub struct ActivityOutcome<T> {
    /// The activity's return value.
    pub value: T,
    /// Number of attempts made before success (1 means it succeeded first try).
    pub attempts: u32,
    /// Idempotency key this invocation was recorded under.
    pub idempotency_key: String,
}

/// Derive an idempotency key from `(workflow_id, phase, deterministic_inputs)`.
///
/// Re-delivery of an activity call with the same key is expected to be a
/// no-op that returns the previously recorded result; the derivation itself
/// is pure so the same triple always yields the same key.
pub fn idempotency_key(
    workflow_id: &str,
    phase: &str,
    deterministic_inputs: &impl Serialize,
) -> crate::Result<String> {
    let payload = serde_json::to_vec(deterministic_inputs)
        .map_err(|e| QuestError::Other(format!("failed to serialize activity inputs: {e}")))?;
    let mut hasher = blake3::Hasher::new();
    hasher.update(workflow_id.as_bytes());
    hasher.update(b"\0");
    hasher.update(phase.as_bytes());
    hasher.update(b"\0");
    hasher.update(&payload);
    Ok(hasher.finalize().to_hex().to_string())
}

/// Run `f` to completion under `policy`, honoring `timeout` per attempt and
/// `cancel` between attempts.
///
/// This is the generic machinery every adapter activity is wrapped in: a
/// timed-out attempt surfaces as [`QuestError::TimedOut`] (itself
/// retriable), a cancel observed between attempts short-circuits with
/// [`QuestError::Cancelled`], and the backoff delay before each retry comes
/// from `policy.delay_for_attempt`, extended by any vendor retry-after hint
/// the prior error carried.
pub async fn run_with_retry<F, Fut, T>(
    name: &str,
    policy: RetryPolicy,
    timeout: Duration,
    cancel: &CancellationToken,
    mut f: F,
) -> crate::Result<ActivityOutcome<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = crate::Result<T>>,
{
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        if cancel.is_cancelled() {
            return Err(QuestError::Cancelled(name.to_string()));
        }

        let attempt_result = tokio::time::timeout(timeout, f()).await;
        let outcome = match attempt_result {
            Ok(Ok(value)) => {
                return Ok(ActivityOutcome {
                    value,
                    attempts: attempt,
                    idempotency_key: String::new(),
                });
            }
            Ok(Err(err)) => err,
            Err(_elapsed) => QuestError::TimedOut {
                activity: name.to_string(),
                elapsed_ms: timeout.as_millis() as u64,
            },
        };

        if !policy.should_retry(&outcome, attempt) {
            return Err(outcome);
        }

        let retry_after = outcome
            .retry_after_ms()
            .map(Duration::from_millis);
        let delay = policy.delay_for_attempt(attempt, retry_after);
        tracing::warn!(activity = name, attempt, delay_ms = delay.as_millis() as u64, error = %outcome, "retrying activity");

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = cancel.cancelled() => return Err(QuestError::Cancelled(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn idempotency_key_is_deterministic() {
        let a = idempotency_key("wf-1", "P2_news_search", &serde_json::json!({"q": "visa"})).unwrap();
        let b = idempotency_key("wf-1", "P2_news_search", &serde_json::json!({"q": "visa"})).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn idempotency_key_differs_on_phase() {
        let a = idempotency_key("wf-1", "P2_news_search", &serde_json::json!({"q": "visa"})).unwrap();
        let b = idempotency_key("wf-1", "P2_deep_research", &serde_json::json!({"q": "visa"})).unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test(start_paused = true)]
    async fn run_with_retry_retries_transient_then_succeeds() {
        let attempts = AtomicU32::new(0);
        let cancel = CancellationToken::new();
        let policy = RetryPolicy {
            max_attempts: 3,
            base: Duration::from_millis(1),
            factor: 2.0,
            max_backoff: Duration::from_millis(8),
        };

        let outcome = run_with_retry("news_search", policy, Duration::from_secs(5), &cancel, || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(QuestError::Upstream5xx {
                        adapter: "tavily".into(),
                        detail: "503".into(),
                    })
                } else {
                    Ok(42)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(outcome.value, 42);
        assert_eq!(outcome.attempts, 3);
    }

    #[tokio::test]
    async fn run_with_retry_does_not_retry_non_transient() {
        let cancel = CancellationToken::new();
        let result: crate::Result<u32> = run_with_retry(
            "llm_complete",
            RetryPolicy::default(),
            Duration::from_secs(5),
            &cancel,
            || async { Err(QuestError::SchemaInvalid("missing field".into())) },
        )
        .await
        .map(|o| o.value);

        assert!(matches!(result, Err(QuestError::SchemaInvalid(_))));
    }
}
