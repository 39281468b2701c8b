//! The terminal, user-visible result of a workflow run.

use serde::{Deserialize, Serialize};

/// One of the seven outcomes a workflow run can produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WorkflowResult {
    /// A new record was written; completeness met its floor.
    Created {
        /// Slug of the new record.
        slug: String,
    },
    /// An existing slug was replaced under `force_update`.
    Updated {
        /// Slug of the replaced record.
        slug: String,
    },
    /// A duplicate was detected before any work began; nothing written.
    Exists {
        /// Slug that already existed.
        slug: String,
    },
    /// Completeness fell below its floor; written with `editorial_status = draft`.
    Draft {
        /// Slug of the draft record.
        slug: String,
        /// Completeness score observed.
        completeness: u8,
    },
    /// A slug conflict was detected at commit time (the concurrent loser of
    /// an insert-if-absent race).
    Duplicate {
        /// Slug that conflicted.
        slug: String,
    },
    /// A terminal error occurred; nothing was committed.
    Failed {
        /// Phase the terminal error occurred in.
        phase: String,
        /// Error category, for client-side handling.
        error_kind: String,
        /// Human-readable detail.
        detail: String,
    },
    /// The workflow was cancelled; any partial writes were rolled back.
    Cancelled {
        /// Last phase that completed before the cancel took effect.
        last_completed_phase: Option<String>,
    },
}

impl WorkflowResult {
    /// Whether this result represents a record that was actually written.
    #[must_use]
    pub fn is_persisted(&self) -> bool {
        matches!(self, Self::Created { .. } | Self::Updated { .. } | Self::Draft { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn created_and_draft_are_persisted() {
        assert!(WorkflowResult::Created { slug: "s".into() }.is_persisted());
        assert!(WorkflowResult::Draft { slug: "s".into(), completeness: 47 }.is_persisted());
        assert!(!WorkflowResult::Exists { slug: "s".into() }.is_persisted());
        assert!(!WorkflowResult::Cancelled { last_completed_phase: None }.is_persisted());
    }
}
