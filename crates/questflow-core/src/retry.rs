//! Per-phase exponential backoff retry policy.

use std::time::Duration;

use crate::error::QuestError;

/// Exponential backoff policy applied to a single phase's activity calls.
///
/// Default cadence: base 1s, factor 2, max 60s, 3 attempts total (the first
/// attempt plus up to two retries).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Backoff duration before the second attempt.
    pub base: Duration,
    /// Multiplier applied to the backoff after each failed attempt.
    pub factor: f64,
    /// Backoff ceiling; the computed delay never exceeds this.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base: Duration::from_secs(1),
            factor: 2.0,
            max_backoff: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries; used for phases whose `on_fail` is fatal
    /// with no retry budget (e.g. persistence after a slug conflict).
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base: Duration::from_secs(0),
            factor: 1.0,
            max_backoff: Duration::from_secs(0),
        }
    }

    /// Backoff delay to apply before attempt number `attempt` (1-indexed;
    /// the delay before attempt 2, i.e. the first retry, is `base`).
    ///
    /// When `retry_after_hint` is set (a vendor-declared retry-after on a
    /// 429/RATE_LIMITED response) the computed delay is extended to at
    /// least the hint, still capped at `max_backoff`.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32, retry_after_hint: Option<Duration>) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let computed = self.base.as_secs_f64() * self.factor.powi(exponent);
        let mut delay = Duration::from_secs_f64(computed.min(self.max_backoff.as_secs_f64()));
        if let Some(hint) = retry_after_hint {
            delay = delay.max(hint).min(self.max_backoff);
        }
        delay
    }

    /// Whether `attempt` (the attempt about to be made, 1-indexed) is still
    /// within budget.
    #[must_use]
    pub fn allows_attempt(&self, attempt: u32) -> bool {
        attempt <= self.max_attempts
    }

    /// Whether `error` is eligible for another try under this policy given
    /// the attempt just made.
    #[must_use]
    pub fn should_retry(&self, error: &QuestError, attempt_just_made: u32) -> bool {
        error.is_retriable() && self.allows_attempt(attempt_just_made + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_follows_base_factor_max() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for_attempt(1, None), Duration::from_secs(1));
        assert_eq!(policy.delay_for_attempt(2, None), Duration::from_secs(2));
        assert_eq!(policy.delay_for_attempt(3, None), Duration::from_secs(4));
    }

    #[test]
    fn delay_is_capped_at_max_backoff() {
        let policy = RetryPolicy::default();
        let far_future = policy.delay_for_attempt(20, None);
        assert_eq!(far_future, Duration::from_secs(60));
    }

    #[test]
    fn retry_after_hint_extends_but_does_not_exceed_cap() {
        let policy = RetryPolicy::default();
        let delay = policy.delay_for_attempt(1, Some(Duration::from_secs(30)));
        assert_eq!(delay, Duration::from_secs(30));

        let capped = policy.delay_for_attempt(1, Some(Duration::from_secs(120)));
        assert_eq!(capped, Duration::from_secs(60));
    }

    #[test]
    fn default_allows_three_attempts() {
        let policy = RetryPolicy::default();
        assert!(policy.allows_attempt(1));
        assert!(policy.allows_attempt(3));
        assert!(!policy.allows_attempt(4));
    }

    #[test]
    fn should_retry_only_transient_within_budget() {
        let policy = RetryPolicy::default();
        let transient = QuestError::Upstream5xx {
            adapter: "tavily".into(),
            detail: "503".into(),
        };
        assert!(policy.should_retry(&transient, 1));
        assert!(policy.should_retry(&transient, 2));
        assert!(!policy.should_retry(&transient, 3));

        let terminal = QuestError::InputInvalid("bad".into());
        assert!(!policy.should_retry(&terminal, 1));
    }
}
