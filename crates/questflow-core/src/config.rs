//! Typed configuration for the workflow engine.
//!
//! Every config knob the core recognizes lives on [`EngineConfig`]; adapter
//! crates and workflow crates read it rather than reaching for environment
//! variables directly, so a single value is threaded consistently through a
//! run.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::retry::RetryPolicy;

/// What the engine does when a payload's completeness score falls below its
/// floor after the configured repair attempts.
///
/// The source material was inconsistent about which behavior is preferred;
/// both are kept as configuration rather than picking one permanently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BelowFloorPolicy {
    /// Attempt a single re-synthesis with expanded research before falling
    /// back to persisting with `status=draft`.
    RetryThenDraft,
    /// Persist immediately with `status=draft` and record an event.
    DraftImmediately,
}

impl Default for BelowFloorPolicy {
    fn default() -> Self {
        Self::RetryThenDraft
    }
}

/// Token-bucket rate limit applied to one external adapter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Tokens (requests) allowed per refill window.
    pub requests_per_window: u32,
    /// Length of the refill window.
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_window: 60,
            window: Duration::from_secs(60),
        }
    }
}

/// All configuration the engine itself consults. Concrete workflow/adapter
/// crates may carry additional config of their own, but anything the core
/// needs to make a decision lives here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Window, in days, the existence check considers when deduplicating.
    pub duplicate_lookback_days: u32,
    /// Minimum completeness score (0-100) required to persist an article
    /// without falling back to `below_floor_policy`.
    pub completeness_floor_article: u8,
    /// Minimum completeness score (0-100) required to persist a company
    /// profile without falling back to `below_floor_policy`.
    pub completeness_floor_company: u8,
    /// Minimum confidence (0.0-1.0) below which a company profile is
    /// considered ambiguous and eligible for re-research.
    pub min_confidence_for_publish: f64,
    /// Whether low ambiguity confidence triggers a re-research wave at all.
    pub rescrape_on_low_confidence: bool,
    /// Maximum number of re-research attempts per workflow (spec caps this
    /// at exactly one).
    pub max_reresearch_attempts: u32,
    /// Number of images the article image sequencer produces.
    pub image_count_article: u8,
    /// Number of images the company image sequencer produces.
    pub image_count_company: u8,
    /// What to do when completeness falls below its floor.
    pub below_floor_policy: BelowFloorPolicy,
    /// Per-adapter rate limit, keyed by adapter name (e.g. `"news_search"`).
    pub rate_limits: HashMap<String, RateLimitConfig>,
    /// Default retry policy applied to phases that don't declare their own.
    pub default_retry: RetryPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            duplicate_lookback_days: 7,
            completeness_floor_article: 60,
            completeness_floor_company: 50,
            min_confidence_for_publish: 0.70,
            rescrape_on_low_confidence: true,
            max_reresearch_attempts: 1,
            image_count_article: 7,
            image_count_company: 2,
            below_floor_policy: BelowFloorPolicy::default(),
            rate_limits: HashMap::new(),
            default_retry: RetryPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Completeness floor for the given record kind (`"article"` or
    /// `"company"`; any other value is treated as the article floor).
    #[must_use]
    pub fn completeness_floor(&self, kind: &str) -> u8 {
        if kind.eq_ignore_ascii_case("company") {
            self.completeness_floor_company
        } else {
            self.completeness_floor_article
        }
    }

    /// Image count for the given record kind.
    #[must_use]
    pub fn image_count(&self, kind: &str) -> u8 {
        if kind.eq_ignore_ascii_case("company") {
            self.image_count_company
        } else {
            self.image_count_article
        }
    }

    /// Rate limit configured for `adapter`, falling back to the default.
    #[must_use]
    pub fn rate_limit_for(&self, adapter: &str) -> RateLimitConfig {
        self.rate_limits
            .get(adapter)
            .copied()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_values() {
        let config = EngineConfig::default();
        assert_eq!(config.duplicate_lookback_days, 7);
        assert_eq!(config.completeness_floor_article, 60);
        assert_eq!(config.completeness_floor_company, 50);
        assert!((config.min_confidence_for_publish - 0.70).abs() < 1e-9);
        assert_eq!(config.max_reresearch_attempts, 1);
        assert_eq!(config.image_count_article, 7);
        assert_eq!(config.image_count_company, 2);
    }

    #[test]
    fn floor_and_image_count_select_by_kind() {
        let config = EngineConfig::default();
        assert_eq!(config.completeness_floor("article"), 60);
        assert_eq!(config.completeness_floor("company"), 50);
        assert_eq!(config.image_count("company"), 2);
    }
}
