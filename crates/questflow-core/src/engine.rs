//! The phase scheduler: runs phases in dependency order, fanning out
//! phases that share no dependency edge and joining at the next phase that
//! depends on more than one of them.

use std::sync::Arc;

use crate::cancellation::CancellationToken;
use crate::context::WorkflowContext;
use crate::error::QuestError;
use crate::history::WorkflowHistory;
use crate::phase::{OnFail, Phase, PhaseOutcome};

/// Terminal result of a full engine run. Workflow crates interpret the
/// context carried by `Completed` into the user-visible status
/// (`created`/`updated`/`exists`/`draft`/`duplicate`) by reading the fields
/// phases recorded — that mapping is workflow-specific, not engine policy.
pub enum WorkflowOutcome {
    /// Every phase settled without a fatal error or cancellation.
    Completed(WorkflowContext),
    /// A phase with `on_fail: Fatal` exhausted its retries or hit a
    /// non-retriable error.
    Failed {
        /// Name of the phase that failed.
        phase: String,
        /// Error message.
        error: String,
    },
    /// A cancel signal was observed; holds the name of the last phase that
    /// reached `Completed` or `SoftSkipped` before the cancel took effect.
    Cancelled {
        /// Last phase to settle before cancellation, if any.
        last_completed_phase: Option<String>,
    },
}

/// Runs one attempt of a phase to settlement: retries per its policy,
/// applies `on_fail` once the retry budget is exhausted, and returns the
/// terminal outcome plus the number of attempts made.
async fn execute_phase(
    phase: &dyn Phase,
    ctx: &mut WorkflowContext,
    cancel: &CancellationToken,
) -> (PhaseOutcome, u32) {
    let spec = phase.spec();
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        if cancel.is_cancelled() {
            return (PhaseOutcome::Cancelled, attempt);
        }

        let attempt_result = tokio::time::timeout(spec.timeout, phase.run(ctx, cancel)).await;
        let error = match attempt_result {
            Ok(Ok(())) => {
                return (
                    PhaseOutcome::Completed(serde_json::json!({
                        "phase": spec.name,
                        "attempts": attempt,
                    })),
                    attempt,
                );
            }
            Ok(Err(e)) => e,
            Err(_elapsed) => QuestError::TimedOut {
                activity: spec.name.clone(),
                elapsed_ms: spec.timeout.as_millis() as u64,
            },
        };

        if spec.retry.should_retry(&error, attempt) {
            let delay = spec
                .retry
                .delay_for_attempt(attempt, error.retry_after_ms().map(std::time::Duration::from_millis));
            tracing::warn!(phase = %spec.name, attempt, error = %error, delay_ms = delay.as_millis() as u64, "phase attempt failed, retrying");
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = cancel.cancelled() => return (PhaseOutcome::Cancelled, attempt),
            }
            continue;
        }

        tracing::error!(phase = %spec.name, attempt, error = %error, on_fail = ?spec.on_fail, "phase exhausted retry budget");

        return match spec.on_fail {
            OnFail::Fatal => (PhaseOutcome::Fatal(error.to_string()), attempt),
            OnFail::SoftSkip | OnFail::PartialOk => {
                let event = crate::context::WorkflowEvent::new(
                    spec.name.clone(),
                    "phase_soft_skip",
                    error.to_string(),
                );
                ctx.record_event(event.clone());
                (PhaseOutcome::SoftSkipped { event }, attempt)
            }
        };
    }
}

/// Executes a fixed set of phases against an initial context, recording
/// every attempt in `history` so a suspended run can be resumed without
/// re-executing settled phases.
pub struct WorkflowEngine;

impl WorkflowEngine {
    /// Construct an engine. Holds no state of its own — configuration lives
    /// on the phases and the context, so one engine instance is reused
    /// across every workflow run a process handles.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Run `phases` to completion (or failure, or cancellation).
    ///
    /// Phases whose dependencies have all settled and which are not yet
    /// settled themselves are run concurrently as a group; the group is
    /// joined (all branches awaited) before the next group is selected,
    /// an explicit barrier at each fan-out point. Each branch runs against
    /// its own clone of the current context and is
    /// merged back after the group settles, so concurrent phases never
    /// observe each other's writes mid-flight.
    pub async fn run(
        &self,
        phases: &[Arc<dyn Phase>],
        mut ctx: WorkflowContext,
        history: &mut WorkflowHistory,
        cancel: &CancellationToken,
    ) -> WorkflowOutcome {
        let mut last_completed: Option<String> = None;

        loop {
            if cancel.is_cancelled() {
                return WorkflowOutcome::Cancelled {
                    last_completed_phase: last_completed,
                };
            }

            let ready: Vec<Arc<dyn Phase>> = phases
                .iter()
                .filter(|p| {
                    let spec = p.spec();
                    !history.is_settled(&spec.name)
                        && spec.dependencies.iter().all(|d| history.is_settled(d))
                })
                .cloned()
                .collect();

            if ready.is_empty() {
                if phases.iter().all(|p| history.is_settled(&p.spec().name)) {
                    return WorkflowOutcome::Completed(ctx);
                }
                return WorkflowOutcome::Failed {
                    phase: "scheduler".to_string(),
                    error: "no phase is ready but not all phases are settled (dependency cycle or missing dependency)".to_string(),
                };
            }

            let branch_futures = ready.iter().map(|phase| {
                let mut branch_ctx = ctx.branch();
                let phase = Arc::clone(phase);
                let cancel = cancel.clone();
                async move {
                    let (outcome, attempts) = execute_phase(phase.as_ref(), &mut branch_ctx, &cancel).await;
                    (phase.spec().name.clone(), branch_ctx, outcome, attempts)
                }
            });

            let results = futures::future::join_all(branch_futures).await;

            let mut fatal: Option<(String, String)> = None;
            let mut cancelled = false;

            for (name, branch_ctx, outcome, attempts) in results {
                history.record(&name, attempts, outcome.clone());
                match outcome {
                    PhaseOutcome::Completed(_) | PhaseOutcome::SoftSkipped { .. } => {
                        ctx.merge(branch_ctx);
                        last_completed = Some(name);
                    }
                    PhaseOutcome::Fatal(error) => {
                        fatal = Some((name, error));
                    }
                    PhaseOutcome::Cancelled => {
                        cancelled = true;
                    }
                    PhaseOutcome::Retrying => {}
                }
            }

            if let Some((phase, error)) = fatal {
                return WorkflowOutcome::Failed { phase, error };
            }
            if cancelled {
                return WorkflowOutcome::Cancelled {
                    last_completed_phase: last_completed,
                };
            }
        }
    }
}

impl Default for WorkflowEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::WorkflowType;
    use crate::phase::{OnFail, PhaseSpec};
    use crate::retry::RetryPolicy;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    struct FnPhase<F> {
        spec: PhaseSpec,
        body: F,
    }

    #[async_trait]
    impl<F> Phase for FnPhase<F>
    where
        F: Fn(&mut WorkflowContext) -> crate::Result<()> + Send + Sync,
    {
        fn spec(&self) -> &PhaseSpec {
            &self.spec
        }

        async fn run(&self, ctx: &mut WorkflowContext, _cancel: &CancellationToken) -> crate::Result<()> {
            (self.body)(ctx)
        }
    }

    fn ctx() -> WorkflowContext {
        WorkflowContext::new("wf-1", WorkflowType::Article, serde_json::json!({}))
    }

    #[tokio::test]
    async fn runs_sequential_phases_in_order() {
        let p1 = Arc::new(FnPhase {
            spec: PhaseSpec::new("P1", vec![], Duration::from_secs(5), OnFail::Fatal),
            body: |ctx: &mut WorkflowContext| ctx.insert("p1_done", true),
        });
        let p2 = Arc::new(FnPhase {
            spec: PhaseSpec::new("P2", vec!["P1".into()], Duration::from_secs(5), OnFail::Fatal),
            body: |ctx: &mut WorkflowContext| ctx.insert("p2_done", true),
        });

        let phases: Vec<Arc<dyn Phase>> = vec![p1, p2];
        let engine = WorkflowEngine::new();
        let mut history = WorkflowHistory::new();
        let cancel = CancellationToken::new();

        match engine.run(&phases, ctx(), &mut history, &cancel).await {
            WorkflowOutcome::Completed(final_ctx) => {
                assert_eq!(final_ctx.get::<bool>("p1_done"), Some(true));
                assert_eq!(final_ctx.get::<bool>("p2_done"), Some(true));
            }
            _ => panic!("expected completion"),
        }
    }

    #[tokio::test]
    async fn fatal_phase_halts_the_workflow() {
        let p1 = Arc::new(FnPhase {
            spec: PhaseSpec::new("P1", vec![], Duration::from_secs(5), OnFail::Fatal)
                .with_retry(RetryPolicy::none()),
            body: |_ctx: &mut WorkflowContext| Err(QuestError::InputInvalid("bad topic".into())),
        });

        let phases: Vec<Arc<dyn Phase>> = vec![p1];
        let engine = WorkflowEngine::new();
        let mut history = WorkflowHistory::new();
        let cancel = CancellationToken::new();

        match engine.run(&phases, ctx(), &mut history, &cancel).await {
            WorkflowOutcome::Failed { phase, .. } => assert_eq!(phase, "P1"),
            _ => panic!("expected failure"),
        }
    }

    #[tokio::test]
    async fn soft_skip_phase_continues_and_records_event() {
        let p1 = Arc::new(FnPhase {
            spec: PhaseSpec::new("P3", vec![], Duration::from_secs(5), OnFail::SoftSkip)
                .with_retry(RetryPolicy::none()),
            body: |_ctx: &mut WorkflowContext| {
                Err(QuestError::DependencySoftFail {
                    dependency: "graph_context".into(),
                    detail: "unreachable".into(),
                })
            },
        });
        let p2 = Arc::new(FnPhase {
            spec: PhaseSpec::new("P4", vec!["P3".into()], Duration::from_secs(5), OnFail::Fatal),
            body: |ctx: &mut WorkflowContext| ctx.insert("p4_done", true),
        });

        let phases: Vec<Arc<dyn Phase>> = vec![p1, p2];
        let engine = WorkflowEngine::new();
        let mut history = WorkflowHistory::new();
        let cancel = CancellationToken::new();

        match engine.run(&phases, ctx(), &mut history, &cancel).await {
            WorkflowOutcome::Completed(final_ctx) => {
                assert_eq!(final_ctx.get::<bool>("p4_done"), Some(true));
                assert_eq!(final_ctx.events().len(), 1);
                assert_eq!(final_ctx.events()[0].code, "phase_soft_skip");
            }
            _ => panic!("expected completion"),
        }
    }

    #[tokio::test]
    async fn independent_phases_fan_out_and_join() {
        let started = Arc::new(AtomicU32::new(0));
        let a_started = Arc::clone(&started);
        let b_started = Arc::clone(&started);

        let a = Arc::new(FnPhase {
            spec: PhaseSpec::new("news_search", vec![], Duration::from_secs(5), OnFail::PartialOk),
            body: move |ctx: &mut WorkflowContext| {
                a_started.fetch_add(1, Ordering::SeqCst);
                ctx.insert("news_search", "done")
            },
        });
        let b = Arc::new(FnPhase {
            spec: PhaseSpec::new("deep_research", vec![], Duration::from_secs(5), OnFail::PartialOk),
            body: move |ctx: &mut WorkflowContext| {
                b_started.fetch_add(1, Ordering::SeqCst);
                ctx.insert("deep_research", "done")
            },
        });
        let join = Arc::new(FnPhase {
            spec: PhaseSpec::new(
                "P3_graph_context",
                vec!["news_search".into(), "deep_research".into()],
                Duration::from_secs(5),
                OnFail::Fatal,
            ),
            body: |ctx: &mut WorkflowContext| ctx.insert("joined", true),
        });

        let phases: Vec<Arc<dyn Phase>> = vec![a, b, join];
        let engine = WorkflowEngine::new();
        let mut history = WorkflowHistory::new();
        let cancel = CancellationToken::new();

        match engine.run(&phases, ctx(), &mut history, &cancel).await {
            WorkflowOutcome::Completed(final_ctx) => {
                assert_eq!(started.load(Ordering::SeqCst), 2);
                assert_eq!(final_ctx.get::<String>("news_search").as_deref(), Some("done"));
                assert_eq!(final_ctx.get::<String>("deep_research").as_deref(), Some("done"));
                assert_eq!(final_ctx.get::<bool>("joined"), Some(true));
            }
            _ => panic!("expected completion"),
        }
    }

    #[tokio::test]
    async fn replaying_from_history_skips_settled_phase() {
        let run_count = Arc::new(AtomicU32::new(0));
        let counted = Arc::clone(&run_count);
        let p1 = Arc::new(FnPhase {
            spec: PhaseSpec::new("P1", vec![], Duration::from_secs(5), OnFail::Fatal),
            body: move |ctx: &mut WorkflowContext| {
                counted.fetch_add(1, Ordering::SeqCst);
                ctx.insert("p1_done", true)
            },
        });

        let phases: Vec<Arc<dyn Phase>> = vec![p1];
        let engine = WorkflowEngine::new();
        let cancel = CancellationToken::new();

        // Pre-populate history as though P1 already completed on a prior attempt.
        let mut history = WorkflowHistory::new();
        history.record("P1", 1, PhaseOutcome::Completed(serde_json::json!({"phase": "P1"})));

        match engine.run(&phases, ctx(), &mut history, &cancel).await {
            WorkflowOutcome::Completed(_) => {
                assert_eq!(run_count.load(Ordering::SeqCst), 0, "settled phase must not re-execute");
            }
            _ => panic!("expected completion"),
        }
    }
}
