//! Completeness scoring: weighted fraction of canonical
//! fields populated, in `[0, 100]`.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use questflow_model::CompletenessScore;

/// Weight contributed by one canonical field when present and non-empty.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FieldWeight {
    /// Canonical field name.
    pub field: &'static str,
    /// Weight contributed when present, summed with the rest of its
    /// profile to 100.
    pub weight: u8,
}

/// A named, ordered set of field weights summing to 100. `article()` and
/// `company()` are the built-in profiles; callers may substitute their own
/// for a different canonical field list.
#[derive(Debug, Clone)]
pub struct CompletenessProfile {
    fields: Vec<FieldWeight>,
}

impl CompletenessProfile {
    /// Construct a profile from an explicit weight list. Panics in debug
    /// builds if the weights don't sum to 100, the same way a
    /// misconfigured scoring table should fail loudly in tests rather than
    /// silently skew every score.
    #[must_use]
    pub fn new(fields: Vec<FieldWeight>) -> Self {
        debug_assert_eq!(
            fields.iter().map(|f| u32::from(f.weight)).sum::<u32>(),
            100,
            "completeness profile weights must sum to 100"
        );
        Self { fields }
    }

    /// The built-in article completeness profile.
    #[must_use]
    pub fn article() -> Self {
        Self::new(vec![
            FieldWeight { field: "title", weight: 10 },
            FieldWeight { field: "markdown_body", weight: 20 },
            FieldWeight { field: "excerpt", weight: 5 },
            FieldWeight { field: "sections", weight: 20 },
            FieldWeight { field: "meta_description", weight: 5 },
            FieldWeight { field: "tags", weight: 5 },
            FieldWeight { field: "featured_image", weight: 10 },
            FieldWeight { field: "hero_image", weight: 5 },
            FieldWeight { field: "content_images", weight: 10 },
            FieldWeight { field: "mentioned_companies", weight: 10 },
        ])
    }

    /// The built-in company completeness profile.
    #[must_use]
    pub fn company() -> Self {
        Self::new(vec![
            FieldWeight { field: "legal_name", weight: 15 },
            FieldWeight { field: "domain", weight: 10 },
            FieldWeight { field: "company_type", weight: 10 },
            FieldWeight { field: "profile_sections", weight: 30 },
            FieldWeight { field: "industry", weight: 10 },
            FieldWeight { field: "headquarters_country", weight: 10 },
            FieldWeight { field: "featured_image", weight: 10 },
            FieldWeight { field: "hero_image", weight: 5 },
        ])
    }

    /// The field weights in this profile.
    #[must_use]
    pub fn fields(&self) -> &[FieldWeight] {
        &self.fields
    }
}

/// Score completeness: the sum of weights for every field name present in
/// `populated_fields`, clamped into `[0, 100]` (a caller passing a field not
/// in `profile` is simply ignored, not an error).
#[must_use]
pub fn score_completeness(populated_fields: &HashSet<&str>, profile: &CompletenessProfile) -> CompletenessScore {
    let total: u32 = profile
        .fields()
        .iter()
        .filter(|f| populated_fields.contains(f.field))
        .map(|f| u32::from(f.weight))
        .sum();
    CompletenessScore::try_new(total.min(100) as u8).unwrap_or_else(|_| {
        CompletenessScore::try_new(100).expect("100 is always a valid completeness score")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_in_profiles_sum_to_100() {
        let article_total: u32 = CompletenessProfile::article().fields().iter().map(|f| u32::from(f.weight)).sum();
        let company_total: u32 = CompletenessProfile::company().fields().iter().map(|f| u32::from(f.weight)).sum();
        assert_eq!(article_total, 100);
        assert_eq!(company_total, 100);
    }

    #[test]
    fn scores_only_present_fields() {
        let profile = CompletenessProfile::article();
        let present: HashSet<&str> = ["title", "markdown_body", "excerpt"].into_iter().collect();
        let score = score_completeness(&present, &profile);
        assert_eq!(score.value(), 35);
    }

    #[test]
    fn sparse_article_can_fall_below_the_persistence_floor() {
        let profile = CompletenessProfile::article();
        let present: HashSet<&str> = ["title", "markdown_body", "sections", "meta_description"].into_iter().collect();
        let score = score_completeness(&present, &profile);
        assert_eq!(score.value(), 55);
        assert!(!score.meets_floor(60));
    }
}
