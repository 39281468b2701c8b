//! Company ambiguity scoring: five signals combined by fixed
//! weights into a single confidence value.

use serde::{Deserialize, Serialize};

use questflow_model::ConfidenceScore;

/// The five weights applied to ambiguity signals. Values match the
/// most-frequently-observed weighting for this scoring problem and are
/// exposed as configuration rather than hardcoded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmbiguityWeights {
    /// Weight for name/URL match strength.
    pub name_url_match: f64,
    /// Weight for category-keyword coverage in gathered text.
    pub category_keyword_coverage: f64,
    /// Weight for source cross-consistency (same legal name across >= 2 sources).
    pub source_cross_consistency: f64,
    /// Weight for absence of homonym warnings.
    pub absence_of_homonym_warnings: f64,
    /// Weight for completeness of core structured fields.
    pub completeness_of_core_fields: f64,
}

impl Default for AmbiguityWeights {
    fn default() -> Self {
        Self {
            name_url_match: 0.30,
            category_keyword_coverage: 0.25,
            source_cross_consistency: 0.20,
            absence_of_homonym_warnings: 0.15,
            completeness_of_core_fields: 0.10,
        }
    }
}

impl AmbiguityWeights {
    /// Sum of all five weights; should equal 1.0 for any weighting used in
    /// production (verified for the default in this crate's tests).
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.name_url_match
            + self.category_keyword_coverage
            + self.source_cross_consistency
            + self.absence_of_homonym_warnings
            + self.completeness_of_core_fields
    }
}

/// The five raw signal values, each in `[0, 1]`, measured for one company
/// candidate before weighting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmbiguitySignals {
    /// Name/URL match strength.
    pub name_url_match: f64,
    /// Category-keyword coverage in gathered text.
    pub category_keyword_coverage: f64,
    /// Source cross-consistency.
    pub source_cross_consistency: f64,
    /// Absence of homonym warnings (1.0 = no warnings raised).
    pub absence_of_homonym_warnings: f64,
    /// Completeness of core structured fields.
    pub completeness_of_core_fields: f64,
}

impl AmbiguitySignals {
    /// Clamp every signal into `[0, 1]`; out-of-range inputs from an
    /// upstream scorer are clamped rather than rejected, since they're
    /// derived heuristics, not user input.
    #[must_use]
    pub fn clamped(self) -> Self {
        let c = |v: f64| v.clamp(0.0, 1.0);
        Self {
            name_url_match: c(self.name_url_match),
            category_keyword_coverage: c(self.category_keyword_coverage),
            source_cross_consistency: c(self.source_cross_consistency),
            absence_of_homonym_warnings: c(self.absence_of_homonym_warnings),
            completeness_of_core_fields: c(self.completeness_of_core_fields),
        }
    }
}

/// Combine signals into a single confidence score using `weights`.
pub fn combine(signals: AmbiguitySignals, weights: AmbiguityWeights) -> ConfidenceScore {
    let signals = signals.clamped();
    let raw = signals.name_url_match * weights.name_url_match
        + signals.category_keyword_coverage * weights.category_keyword_coverage
        + signals.source_cross_consistency * weights.source_cross_consistency
        + signals.absence_of_homonym_warnings * weights.absence_of_homonym_warnings
        + signals.completeness_of_core_fields * weights.completeness_of_core_fields;
    ConfidenceScore::try_new(raw.clamp(0.0, 1.0)).unwrap_or_else(|_| {
        ConfidenceScore::try_new(0.0).expect("0.0 is always a valid confidence score")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_weights_sum_to_one() {
        assert!((AmbiguityWeights::default().sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn perfect_signals_yield_confidence_one() {
        let signals = AmbiguitySignals {
            name_url_match: 1.0,
            category_keyword_coverage: 1.0,
            source_cross_consistency: 1.0,
            absence_of_homonym_warnings: 1.0,
            completeness_of_core_fields: 1.0,
        };
        let confidence = combine(signals, AmbiguityWeights::default());
        assert!((confidence.value() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn thrivealts_like_example_falls_below_threshold_then_recovers() {
        let weak = AmbiguitySignals {
            name_url_match: 0.6,
            category_keyword_coverage: 0.5,
            source_cross_consistency: 0.5,
            absence_of_homonym_warnings: 0.7,
            completeness_of_core_fields: 0.4,
        };
        let initial = combine(weak, AmbiguityWeights::default());
        assert!(initial.value() < 0.70);

        let strong = AmbiguitySignals {
            name_url_match: 0.95,
            category_keyword_coverage: 0.85,
            source_cross_consistency: 0.9,
            absence_of_homonym_warnings: 0.9,
            completeness_of_core_fields: 0.7,
        };
        let after_reresearch = combine(strong, AmbiguityWeights::default());
        assert!(after_reresearch.value() >= 0.70);
    }
}
