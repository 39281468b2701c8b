//! Deterministic slug derivation (model invariant 1).

use crate::diacritics;

const MAX_SLUG_LEN: usize = 100;

/// Derive a URL-safe slug: lowercase, diacritic-fold, non-alphanumerics
/// collapse to a single `-`, trim leading/trailing `-`, truncate to 100
/// chars. Deterministic and idempotent: `slugify(slugify(x)) == slugify(x)`.
#[must_use]
pub fn slugify(input: &str) -> String {
    let folded = diacritics::fold(input).to_lowercase();

    let mut slug = String::with_capacity(folded.len());
    let mut last_was_dash = false;
    for c in folded.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
            last_was_dash = false;
        } else if !last_was_dash {
            slug.push('-');
            last_was_dash = true;
        }
    }

    let trimmed = slug.trim_matches('-');
    let truncated: String = trimmed.chars().take(MAX_SLUG_LEN).collect();
    truncated.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn basic_case() {
        assert_eq!(slugify("Digital Nomad Visa Greece"), "digital-nomad-visa-greece");
    }

    #[test]
    fn collapses_runs_and_trims() {
        assert_eq!(slugify("  --Hello,   World!!--  "), "hello-world");
    }

    #[test]
    fn folds_diacritics() {
        assert_eq!(slugify("Société Générale"), "societe-generale");
    }

    #[test]
    fn truncates_to_100_chars() {
        let long = "a".repeat(150);
        assert_eq!(slugify(&long).len(), 100);
    }

    #[test]
    fn truncation_does_not_leave_trailing_dash() {
        let input = format!("{}-{}", "a".repeat(99), "trailing-part");
        let slug = slugify(&input);
        assert!(!slug.ends_with('-'));
    }

    proptest! {
        #[test]
        fn slug_is_idempotent(s in "\\PC{0,200}") {
            let once = slugify(&s);
            let twice = slugify(&once);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn slug_never_exceeds_max_len(s in "\\PC{0,500}") {
            prop_assert!(slugify(&s).len() <= MAX_SLUG_LEN);
        }
    }
}
