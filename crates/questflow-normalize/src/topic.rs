//! Topic normalization: trim, collapse whitespace, strip
//! control characters, case-fold. The original string is preserved
//! alongside the canonical form so the synthesizer can still render the
//! topic as the user wrote it.

use serde::{Deserialize, Serialize};

use crate::diacritics;

/// A topic string alongside its canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedTopic {
    /// The string exactly as supplied.
    pub original: String,
    /// Trimmed, whitespace-collapsed, control-stripped, case-folded form
    /// used for slug derivation and existence checks.
    pub canonical: String,
}

/// Normalize a topic string.
#[must_use]
pub fn normalize_topic(input: &str) -> NormalizedTopic {
    let stripped: String = input.chars().filter(|c| !c.is_control()).collect();

    let mut canonical = String::with_capacity(stripped.len());
    let mut last_was_space = false;
    for c in stripped.trim().chars() {
        if c.is_whitespace() {
            if !last_was_space {
                canonical.push(' ');
            }
            last_was_space = true;
        } else {
            canonical.push(c);
            last_was_space = false;
        }
    }

    let canonical = diacritics::fold(&canonical).to_lowercase();

    NormalizedTopic {
        original: input.to_string(),
        canonical,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn collapses_whitespace_and_case_folds() {
        let normalized = normalize_topic("  Digital   Nomad\tVisa  Greece  ");
        assert_eq!(normalized.canonical, "digital nomad visa greece");
        assert_eq!(normalized.original, "  Digital   Nomad\tVisa  Greece  ");
    }

    #[test]
    fn strips_control_characters() {
        let normalized = normalize_topic("Visa\u{0007}Greece");
        assert_eq!(normalized.canonical, "visagreece");
    }

    #[test]
    fn folds_diacritics_for_canonical_form() {
        let normalized = normalize_topic("Société Visa");
        assert_eq!(normalized.canonical, "societe visa");
    }

    proptest! {
        #[test]
        fn normalization_is_idempotent_on_canonical_form(s in "\\PC{0,200}") {
            let once = normalize_topic(&s);
            let twice = normalize_topic(&once.canonical);
            prop_assert_eq!(once.canonical, twice.canonical);
        }

        /// Two differently-cased, differently-padded inputs that normalize to
        /// the same canonical form must slug to the same value.
        #[test]
        fn inputs_that_normalize_equal_slug_equal(s in "[a-zA-Z]{1,40}( [a-zA-Z]{1,40}){0,5}") {
            let padded = format!("  {}  ", s.to_uppercase());
            let canonical_a = normalize_topic(&s).canonical;
            let canonical_b = normalize_topic(&padded).canonical;
            prop_assert_eq!(&canonical_a, &canonical_b);
            prop_assert_eq!(crate::slugify(&canonical_a), crate::slugify(&canonical_b));
        }
    }
}
