//! Per-section synthesizer confidence: derived from the number
//! and diversity of supporting sources behind a section's claims.

use questflow_model::ConfidenceScore;

/// Confidence contributed by each additional supporting source, before
/// diminishing returns via the cap.
const PER_SOURCE_WEIGHT: f64 = 0.15;
/// Additional confidence contributed by source diversity (distinct
/// origins), rewarding corroboration over repetition of one outlet.
const PER_ORIGIN_WEIGHT: f64 = 0.10;
/// Floor confidence for a section backed by at least one source.
const BASE_CONFIDENCE: f64 = 0.30;

/// Compute a section's confidence from how many sources back it and how
/// many distinct origins (outlets/adapters) those sources came from.
///
/// Zero sources yields zero confidence outright — an unsupported section
/// should never be emitted by the synthesizer (see the narrative-first
/// citation requirement), so this function is also used as a cheap guard
/// before a section is constructed.
#[must_use]
pub fn section_confidence(source_count: usize, distinct_origins: usize) -> ConfidenceScore {
    if source_count == 0 {
        return ConfidenceScore::try_new(0.0).expect("0.0 is always valid");
    }
    let raw = BASE_CONFIDENCE
        + PER_SOURCE_WEIGHT * (source_count as f64)
        + PER_ORIGIN_WEIGHT * (distinct_origins as f64);
    ConfidenceScore::try_new(raw.clamp(0.0, 1.0)).expect("clamped into range")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sources_yields_zero_confidence() {
        assert!((section_confidence(0, 0).value()).abs() < 1e-9);
    }

    #[test]
    fn more_sources_and_diversity_increase_confidence() {
        let single = section_confidence(1, 1);
        let many = section_confidence(4, 3);
        assert!(many.value() > single.value());
    }

    #[test]
    fn confidence_is_capped_at_one() {
        let saturated = section_confidence(50, 20);
        assert!(saturated.value() <= 1.0);
    }
}
