//! Error taxonomy for the workflow engine and its adapters.
//!
//! Every error the engine or an adapter can raise belongs to exactly one of
//! five categories. The category — not the specific variant — decides
//! whether the engine retries, repairs, bubbles to a terminal status, or
//! records a soft-skip event and continues.

use thiserror::Error;

/// The five error categories the engine distinguishes when deciding how to
/// propagate a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Validation/canonicalization failure. Never retried; terminal.
    Input,
    /// Network, 5xx, timeout, rate-limit. Retried under the phase's policy.
    Transient,
    /// Schema violation or unresolved reference. One repair attempt, then terminal.
    Data,
    /// Slug conflict, below-floor completeness, unresolved ambiguity. Terminal with a distinct status.
    Business,
    /// Graph sync / link cleanse class failures. Soft-skip: recorded, does not block success.
    Dependency,
}

/// The engine- and adapter-level error type.
///
/// Adapter crates define their own vendor-specific error enums and convert
/// into this type at the crate boundary (see each adapter's `error` module),
/// the same way a vendor client never leaks its wire-level error type past
/// its own crate.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuestError {
    /// Input failed validation before any activity ran.
    #[error("input invalid: {0}")]
    InputInvalid(String),

    /// Input could not be normalized into a canonical form.
    #[error("normalization failed: {0}")]
    NormalizationFailed(String),

    /// An adapter call timed out.
    #[error("activity '{activity}' timed out after {elapsed_ms}ms")]
    TimedOut {
        /// Name of the activity that timed out.
        activity: String,
        /// Elapsed time in milliseconds before the timeout fired.
        elapsed_ms: u64,
    },

    /// Adapter returned a rate-limit response; `retry_after_ms` is an optional
    /// vendor hint the retry policy should honor.
    #[error("rate limited by '{adapter}'{}", retry_after_ms.map(|ms| format!(", retry after {ms}ms")).unwrap_or_default())]
    RateLimited {
        /// Adapter that reported the rate limit.
        adapter: String,
        /// Vendor-declared retry-after hint, in milliseconds.
        retry_after_ms: Option<u64>,
    },

    /// Adapter reported an upstream 5xx.
    #[error("upstream 5xx from '{adapter}': {detail}")]
    Upstream5xx {
        /// Adapter that reported the failure.
        adapter: String,
        /// Vendor-supplied detail string.
        detail: String,
    },

    /// Adapter call failed to fetch a resource (crawler).
    #[error("fetch failed for {url}: {detail}")]
    FetchFailed {
        /// URL that could not be fetched.
        url: String,
        /// Detail of the failure.
        detail: String,
    },

    /// Crawler hit a paywall.
    #[error("paywall encountered at {0}")]
    Paywall(String),

    /// Adapter reported the resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Adapter returned no usable items.
    #[error("empty result from '{0}'")]
    Empty(String),

    /// Structured output failed schema validation.
    #[error("schema invalid after repair attempts: {0}")]
    SchemaInvalid(String),

    /// Image generation was blocked by a vendor content policy.
    #[error("content policy violation: {0}")]
    ContentPolicy(String),

    /// Store reported a slug conflict (unique (app, kind, slug) violated).
    #[error("slug conflict for ({app}, {kind}, {slug})")]
    SlugConflict {
        /// App tag the slug was scoped to.
        app: String,
        /// Record kind (article|company).
        kind: String,
        /// The conflicting slug.
        slug: String,
    },

    /// Store reported a constraint violation other than slug uniqueness.
    #[error("store constraint violated: {0}")]
    Constraint(String),

    /// Completeness score fell below the configured floor after the
    /// configured number of repair attempts.
    #[error("completeness {actual} below floor {floor} for {kind}")]
    BelowCompletenessFloor {
        /// Record kind the floor applies to.
        kind: String,
        /// Observed completeness score.
        actual: u8,
        /// Configured floor.
        floor: u8,
    },

    /// Company ambiguity could not be resolved even after re-research.
    #[error("ambiguity unresolved: confidence {confidence:.2} below threshold {threshold:.2}")]
    AmbiguityUnresolved {
        /// Final confidence score after re-research (if any).
        confidence: f64,
        /// Configured minimum confidence threshold.
        threshold: f64,
    },

    /// A dependency-class failure (graph sync, link cleanse). Always
    /// soft-skipped by the engine; carried here so adapters have a uniform
    /// way to signal it.
    #[error("dependency '{dependency}' failed: {detail}")]
    DependencySoftFail {
        /// Name of the soft dependency.
        dependency: String,
        /// Detail of the failure.
        detail: String,
    },

    /// The workflow was cancelled by an external signal.
    #[error("workflow cancelled at phase '{0}'")]
    Cancelled(String),

    /// Catch-all for adapter-specific failures that don't fit another
    /// variant; adapters should prefer a specific variant when one exists.
    #[error("{0}")]
    Other(String),
}

impl QuestError {
    /// Classify this error into one of the five propagation categories.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            QuestError::InputInvalid(_) | QuestError::NormalizationFailed(_) => {
                ErrorCategory::Input
            }
            QuestError::TimedOut { .. }
            | QuestError::RateLimited { .. }
            | QuestError::Upstream5xx { .. }
            | QuestError::FetchFailed { .. } => ErrorCategory::Transient,
            QuestError::SchemaInvalid(_) | QuestError::Empty(_) => ErrorCategory::Data,
            QuestError::Paywall(_) | QuestError::NotFound(_) | QuestError::ContentPolicy(_) => {
                ErrorCategory::Data
            }
            QuestError::SlugConflict { .. }
            | QuestError::Constraint(_)
            | QuestError::BelowCompletenessFloor { .. }
            | QuestError::AmbiguityUnresolved { .. } => ErrorCategory::Business,
            QuestError::DependencySoftFail { .. } => ErrorCategory::Dependency,
            QuestError::Cancelled(_) | QuestError::Other(_) => ErrorCategory::Input,
        }
    }

    /// Whether the engine's retry policy should ever retry this error.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        self.category() == ErrorCategory::Transient
    }

    /// Whether this error should be recorded as a soft-skip event rather
    /// than failing the workflow.
    #[must_use]
    pub fn is_soft_skip(&self) -> bool {
        self.category() == ErrorCategory::Dependency
    }

    /// Vendor-declared retry-after hint in milliseconds, when present.
    #[must_use]
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            QuestError::RateLimited { retry_after_ms, .. } => *retry_after_ms,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_is_transient_and_retriable() {
        let err = QuestError::RateLimited {
            adapter: "tavily".into(),
            retry_after_ms: Some(2_000),
        };
        assert_eq!(err.category(), ErrorCategory::Transient);
        assert!(err.is_retriable());
        assert_eq!(err.retry_after_ms(), Some(2_000));
    }

    #[test]
    fn input_invalid_is_never_retried() {
        let err = QuestError::InputInvalid("topic too short".into());
        assert_eq!(err.category(), ErrorCategory::Input);
        assert!(!err.is_retriable());
    }

    #[test]
    fn dependency_failure_is_soft_skip() {
        let err = QuestError::DependencySoftFail {
            dependency: "graph_sync".into(),
            detail: "timeout".into(),
        };
        assert!(err.is_soft_skip());
        assert!(!err.is_retriable());
    }

    #[test]
    fn slug_conflict_is_business_terminal() {
        let err = QuestError::SlugConflict {
            app: "relocation".into(),
            kind: "article".into(),
            slug: "digital-nomad-visa-greece".into(),
        };
        assert_eq!(err.category(), ErrorCategory::Business);
        assert!(!err.is_retriable());
        assert!(!err.is_soft_skip());
    }
}
