//! The research bundle assembled by the P2 fan-out (and its optional
//! secondary crawl wave, and the company pipeline's re-research).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ConfidenceScore;

/// Which external source kind a [`SourceBundle`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// The `news_search` adapter.
    NewsSearch,
    /// The `deep_research` adapter.
    DeepResearch,
    /// Crawled general news pages.
    CrawledNews,
    /// Crawled authoritative (e.g. government, official registry) pages.
    CrawledAuthoritative,
    /// Prior context read from the knowledge graph.
    GraphContext,
}

/// One retrieved item. Items without a `url` are synthetic (e.g. a
/// graph-context summary with no single source page) and are excluded from
/// citation validation in the synthesizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchItem {
    /// Source URL, when the item has one.
    pub url: Option<String>,
    /// Title as reported by the source.
    pub title: String,
    /// Short excerpt.
    pub snippet: String,
    /// Full extracted text, when retrieved.
    pub full_text: Option<String>,
    /// Publication timestamp, RFC 3339, when known.
    pub published_at: Option<String>,
    /// Source-declared confidence.
    pub confidence: ConfidenceScore,
}

impl ResearchItem {
    /// Whether this item has no URL and is therefore excluded from
    /// citation validation.
    #[must_use]
    pub fn is_synthetic(&self) -> bool {
        self.url.is_none()
    }
}

/// Provenance and contents retrieved from a single source kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceBundle {
    /// When this bundle was retrieved, RFC 3339.
    pub retrieved_at: String,
    /// Adapter/vendor identifier that produced this bundle.
    pub origin: String,
    /// Retrieved items.
    pub items: Vec<ResearchItem>,
    /// Monetary cost of this retrieval, in USD.
    pub cost_usd: f64,
    /// Latency of this retrieval.
    pub latency_ms: u64,
    /// Set when the bundle is empty due to a failure (the adapter
    /// contributed an empty bundle tagged with its failure code, per the
    /// soft join semantics of P2).
    pub failure_note: Option<String>,
}

impl SourceBundle {
    /// Construct an empty bundle tagged with a failure code, for the soft
    /// join: an adapter that fails after retries still contributes a
    /// bundle, just an empty one.
    #[must_use]
    pub fn empty_with_failure(origin: impl Into<String>, retrieved_at: impl Into<String>, failure_note: impl Into<String>) -> Self {
        Self {
            retrieved_at: retrieved_at.into(),
            origin: origin.into(),
            items: Vec::new(),
            cost_usd: 0.0,
            latency_ms: 0,
            failure_note: Some(failure_note.into()),
        }
    }

    /// Items eligible for citation validation (non-synthetic, i.e. carrying a URL).
    #[must_use]
    pub fn citable_items(&self) -> Vec<&ResearchItem> {
        self.items.iter().filter(|item| !item.is_synthetic()).collect()
    }

    /// Whether this bundle contributed anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// All research gathered for a workflow instance, keyed by source kind.
///
/// Invariant: every bundle carries the provenance of every item (`origin`,
/// `retrieved_at` on the bundle); items without a URL are marked synthetic
/// via [`ResearchItem::is_synthetic`] and excluded from citation
/// validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchBundle {
    bundles: HashMap<SourceKind, SourceBundle>,
}

impl ResearchBundle {
    /// An empty bundle, ready to be populated one source at a time.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record (or replace) the bundle for `kind`.
    pub fn set(&mut self, kind: SourceKind, bundle: SourceBundle) {
        self.bundles.insert(kind, bundle);
    }

    /// The bundle recorded for `kind`, if any.
    #[must_use]
    pub fn get(&self, kind: SourceKind) -> Option<&SourceBundle> {
        self.bundles.get(&kind)
    }

    /// Whether at least one source bundle contributed a non-empty result
    /// (P2's "partial-ok" requirement: at least one non-empty bundle).
    #[must_use]
    pub fn has_any_content(&self) -> bool {
        self.bundles.values().any(|b| !b.is_empty())
    }

    /// All citable items across every source bundle, in source-kind
    /// iteration order. Used by the synthesizer's citation check.
    #[must_use]
    pub fn all_citable_items(&self) -> Vec<&ResearchItem> {
        self.bundles.values().flat_map(SourceBundle::citable_items).collect()
    }

    /// Total monetary cost across all source bundles.
    #[must_use]
    pub fn total_cost_usd(&self) -> f64 {
        self.bundles.values().map(|b| b.cost_usd).sum()
    }
}
