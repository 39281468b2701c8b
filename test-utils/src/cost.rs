//! Cost tracking for integration tests that call real (sandboxed) vendors.
//!
//! Mirrors the per-source cost accounting `ResearchBundle` carries in
//! production: tests accumulate spend the same way so a runaway test can be
//! caught before it burns a budget.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Accumulates USD cost across a test run, in microdollars for atomic math.
#[derive(Clone)]
pub struct CostTracker {
    budget_usd: f64,
    spent_microdollars: Arc<AtomicU64>,
    call_count: Arc<AtomicU64>,
}

impl Default for CostTracker {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl CostTracker {
    /// Create a tracker with the given budget in USD.
    #[must_use]
    pub fn new(budget_usd: f64) -> Self {
        Self {
            budget_usd,
            spent_microdollars: Arc::new(AtomicU64::new(0)),
            call_count: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Record a single adapter call's cost in USD.
    pub fn record(&self, cost_usd: f64) {
        let microdollars = (cost_usd * 1_000_000.0).max(0.0) as u64;
        self.spent_microdollars
            .fetch_add(microdollars, Ordering::Relaxed);
        self.call_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Total spend so far, in USD.
    #[must_use]
    pub fn total_cost(&self) -> f64 {
        self.spent_microdollars.load(Ordering::Relaxed) as f64 / 1_000_000.0
    }

    /// Whether the tracked spend has exceeded the budget.
    #[must_use]
    pub fn is_over_budget(&self) -> bool {
        self.total_cost() > self.budget_usd
    }

    /// Produce a summary snapshot.
    #[must_use]
    pub fn report(&self) -> CostReport {
        CostReport {
            total_cost_usd: self.total_cost(),
            budget_usd: self.budget_usd,
            call_count: self.call_count.load(Ordering::Relaxed),
            over_budget: self.is_over_budget(),
        }
    }
}

/// Snapshot of a [`CostTracker`]'s state.
#[derive(Debug, Clone)]
pub struct CostReport {
    /// Total USD spent so far.
    pub total_cost_usd: f64,
    /// Budget ceiling in USD.
    pub budget_usd: f64,
    /// Number of recorded adapter calls.
    pub call_count: u64,
    /// Whether spend has exceeded budget.
    pub over_budget: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_spend_and_budget() {
        let tracker = CostTracker::new(1.0);
        tracker.record(0.25);
        tracker.record(0.50);
        assert!((tracker.total_cost() - 0.75).abs() < 1e-9);
        assert!(!tracker.is_over_budget());

        tracker.record(0.50);
        assert!(tracker.is_over_budget());
        assert_eq!(tracker.report().call_count, 3);
    }
}
