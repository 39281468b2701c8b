//! The phase contract: a named step with declared dependencies, timeout,
//! and retry policy, whose body is executed against the shared
//! [`WorkflowContext`].

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cancellation::CancellationToken;
use crate::context::{WorkflowContext, WorkflowEvent};
use crate::retry::RetryPolicy;

/// What the engine does when a phase exhausts its retry budget (or hits a
/// non-retriable error).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OnFail {
    /// Terminate the workflow with a `failed` result.
    Fatal,
    /// Record an event and continue; the phase's own output is whatever
    /// default/partial state it left in the context (sentiments default to
    /// neutral, URL list preserved as-is, etc).
    SoftSkip,
    /// The workflow proceeds with whatever subset of the phase's internal
    /// fan-out succeeded (e.g. P2's four research adapters); the phase
    /// implementation itself decides what counts as "enough".
    PartialOk,
}

/// Declarative metadata for a phase: name, dependency edges, and execution
/// policy. The phase's behavior lives in the [`Phase`] trait impl; `PhaseSpec`
/// is what the engine uses to schedule it.
#[derive(Debug, Clone)]
pub struct PhaseSpec {
    /// Unique name within a workflow (e.g. `"P1_normalize"`).
    pub name: String,
    /// Names of phases that must have settled before this one starts.
    pub dependencies: Vec<String>,
    /// Wall-clock budget for a single attempt.
    pub timeout: Duration,
    /// Retry policy for transient failures.
    pub retry: RetryPolicy,
    /// What happens when retries are exhausted.
    pub on_fail: OnFail,
}

impl PhaseSpec {
    /// Construct a spec with the engine's default retry policy.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        dependencies: Vec<String>,
        timeout: Duration,
        on_fail: OnFail,
    ) -> Self {
        Self {
            name: name.into(),
            dependencies,
            timeout,
            retry: RetryPolicy::default(),
            on_fail,
        }
    }

    /// Override the retry policy (e.g. [`RetryPolicy::none`] for a phase
    /// whose `on_fail` is fatal with no retry budget).
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// What a single phase attempt resolved to. Recorded in [`crate::history::WorkflowHistory`]
/// so a resumed workflow can replay a settled phase instead of re-running it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PhaseOutcome {
    /// The phase completed; `Value` is a JSON snapshot of what it recorded,
    /// kept for audit/replay rather than re-read by the engine.
    Completed(Value),
    /// The phase failed but was absorbed as a soft-skip or partial-ok.
    SoftSkipped {
        /// The event recorded for this soft-skip.
        event: WorkflowEvent,
    },
    /// The phase failed fatally; the workflow terminates.
    Fatal(String),
    /// An attempt failed but the retry budget is not exhausted; this phase
    /// will be attempted again.
    Retrying,
    /// The workflow was cancelled while this phase was in flight.
    Cancelled,
}

/// A phase's executable body.
///
/// Implementors perform whatever activity calls the phase needs and append
/// their results to `ctx`. Returning `Err` signals failure to the engine,
/// which classifies it via [`crate::error::QuestError::category`] and
/// applies `spec().retry` / `spec().on_fail`.
#[async_trait]
pub trait Phase: Send + Sync {
    /// This phase's scheduling metadata.
    fn spec(&self) -> &PhaseSpec;

    /// Run one attempt of this phase's body.
    async fn run(&self, ctx: &mut WorkflowContext, cancel: &CancellationToken) -> crate::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_defaults_to_standard_retry_policy() {
        let spec = PhaseSpec::new(
            "P5_synthesis",
            vec!["P2_research".into()],
            Duration::from_secs(180),
            OnFail::Fatal,
        );
        assert_eq!(spec.retry, RetryPolicy::default());
        assert_eq!(spec.on_fail, OnFail::Fatal);
    }

    #[test]
    fn with_retry_overrides_policy() {
        let spec = PhaseSpec::new("P10_persist", vec![], Duration::from_secs(30), OnFail::Fatal)
            .with_retry(RetryPolicy::none());
        assert_eq!(spec.retry.max_attempts, 1);
    }
}
