//! Vendor cost tracking, feeding the `research_cost` field carried on every
//! published payload.
//!
//! Scoped to the one thing this pipeline's payload contract needs: summing
//! per-vendor-call cost into a single total attached to a workflow run.
//! Hard budget limits and alert thresholds were dropped; see `DESIGN.md`.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

/// Per-model price, stored as USD per 1,000 tokens.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pricing {
    pub input_per_1k: f64,
    pub output_per_1k: f64,
}

impl Pricing {
    #[must_use]
    pub fn per_1k(input: f64, output: f64) -> Self {
        Self { input_per_1k: input, output_per_1k: output }
    }

    #[must_use]
    pub fn cost_for(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        (input_tokens as f64 / 1000.0) * self.input_per_1k
            + (output_tokens as f64 / 1000.0) * self.output_per_1k
    }
}

/// Pricing table keyed by model name.
#[derive(Debug, Clone, Default)]
pub struct ModelPricing {
    prices: HashMap<String, Pricing>,
}

impl ModelPricing {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>, pricing: Pricing) -> Self {
        self.prices.insert(model.into(), pricing);
        self
    }

    #[must_use]
    pub fn get(&self, model: &str) -> Option<Pricing> {
        self.prices.get(model).copied()
    }
}

/// One vendor call's contribution to the workflow's research cost.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostRecord {
    pub vendor: String,
    pub model: Option<String>,
    pub usd: f64,
}

/// Accumulates cost records for a single workflow run.
///
/// Cheap to clone-and-share: internally `Mutex`-guarded so adapters running
/// concurrently during research fan-out can all record into the
/// same tracker without the caller coordinating locking.
#[derive(Debug, Default)]
pub struct CostTracker {
    records: Mutex<Vec<CostRecord>>,
}

impl CostTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a fixed per-call cost (news/deep-research/crawler/image-gen
    /// calls that bill per request rather than per token).
    pub fn record_call(&self, vendor: impl Into<String>, usd: f64) {
        let vendor = vendor.into();
        tracing::debug!(%vendor, usd, "recording vendor call cost");
        self.records.lock().unwrap_or_else(|e| e.into_inner()).push(CostRecord {
            vendor,
            model: None,
            usd,
        });
    }

    /// Record an LLM call priced by token usage against `pricing`.
    pub fn record_llm_call(
        &self,
        vendor: impl Into<String>,
        model: &str,
        pricing: &ModelPricing,
        input_tokens: u64,
        output_tokens: u64,
    ) {
        let usd = pricing.get(model).map(|p| p.cost_for(input_tokens, output_tokens)).unwrap_or(0.0);
        let vendor = vendor.into();
        tracing::debug!(%vendor, model, input_tokens, output_tokens, usd, "recording llm call cost");
        self.records.lock().unwrap_or_else(|e| e.into_inner()).push(CostRecord {
            vendor,
            model: Some(model.to_string()),
            usd,
        });
    }

    /// Total accumulated cost in USD, the value written into a payload's
    /// `research_cost` field at persistence time.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).iter().map(|r| r.usd).sum()
    }

    #[must_use]
    pub fn records(&self) -> Vec<CostRecord> {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_call_cost_accumulates() {
        let tracker = CostTracker::new();
        tracker.record_call("tavily", 0.01);
        tracker.record_call("exa", 0.02);
        assert!((tracker.total() - 0.03).abs() < 1e-9);
    }

    #[test]
    fn llm_call_cost_uses_pricing_table() {
        let pricing = ModelPricing::new().with_model("claude-3-5-sonnet", Pricing::per_1k(0.003, 0.015));
        let tracker = CostTracker::new();
        tracker.record_llm_call("anthropic", "claude-3-5-sonnet", &pricing, 1000, 500);
        let expected = 1.0 * 0.003 + 0.5 * 0.015;
        assert!((tracker.total() - expected).abs() < 1e-9);
    }

    #[test]
    fn unknown_model_contributes_zero_cost() {
        let pricing = ModelPricing::new();
        let tracker = CostTracker::new();
        tracker.record_llm_call("anthropic", "unknown-model", &pricing, 1000, 500);
        assert_eq!(tracker.total(), 0.0);
    }
}
