//! Event-sourced history of phase outcomes, enabling replay.
//!
//! The engine is deterministic given `(input, activity-result history)`: it
//! may suspend at any phase boundary, and on resume it must replay prior
//! results from history rather than re-executing their activities. This
//! mirrors the checkpoint/resume discipline of an event-sourced graph
//! runtime, narrowed to the one property that matters here — a completed
//! phase is never run twice.

use serde::{Deserialize, Serialize};

use crate::phase::PhaseOutcome;

/// One recorded phase execution attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseRecord {
    /// Name of the phase this record belongs to.
    pub phase: String,
    /// 1-indexed attempt number within that phase.
    pub attempt: u32,
    /// What happened on this attempt.
    pub outcome: PhaseOutcome,
}

/// Append-only log of phase attempts for a single workflow instance.
///
/// On resume, [`WorkflowHistory::last_outcome`] lets the engine skip
/// straight to the result of a phase that already ran to completion,
/// instead of re-invoking its activities.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowHistory {
    records: Vec<PhaseRecord>,
}

impl WorkflowHistory {
    /// A fresh, empty history (a workflow starting from scratch).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconstruct a history from previously persisted records, for resume.
    #[must_use]
    pub fn from_records(records: Vec<PhaseRecord>) -> Self {
        Self { records }
    }

    /// All records in execution order.
    #[must_use]
    pub fn records(&self) -> &[PhaseRecord] {
        &self.records
    }

    /// Append a new attempt record.
    pub fn record(&mut self, phase: impl Into<String>, attempt: u32, outcome: PhaseOutcome) {
        self.records.push(PhaseRecord {
            phase: phase.into(),
            attempt,
            outcome,
        });
    }

    /// Number of attempts already recorded for `phase`.
    #[must_use]
    pub fn attempts_for(&self, phase: &str) -> u32 {
        self.records.iter().filter(|r| r.phase == phase).count() as u32
    }

    /// The most recent outcome recorded for `phase`, if any.
    #[must_use]
    pub fn last_outcome(&self, phase: &str) -> Option<&PhaseOutcome> {
        self.records
            .iter()
            .rev()
            .find(|r| r.phase == phase)
            .map(|r| &r.outcome)
    }

    /// Whether `phase` already reached a terminal, non-retriable outcome
    /// (completed, soft-skipped, or fatally failed) and can be replayed
    /// from history instead of re-executed.
    #[must_use]
    pub fn is_settled(&self, phase: &str) -> bool {
        matches!(
            self.last_outcome(phase),
            Some(PhaseOutcome::Completed(_))
                | Some(PhaseOutcome::SoftSkipped { .. })
                | Some(PhaseOutcome::Fatal(_))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn replays_settled_phase_without_rerun() {
        let mut history = WorkflowHistory::new();
        history.record("P1", 1, PhaseOutcome::Completed(json!({"slug": "x"})));

        assert!(history.is_settled("P1"));
        assert_eq!(history.attempts_for("P1"), 1);
        match history.last_outcome("P1") {
            Some(PhaseOutcome::Completed(value)) => assert_eq!(value["slug"], "x"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn unsettled_phase_is_not_replayed() {
        let mut history = WorkflowHistory::new();
        history.record("P5", 1, PhaseOutcome::Retrying);
        assert!(!history.is_settled("P5"));
        assert_eq!(history.attempts_for("P5"), 1);
    }
}
