//! Company-only ambiguity scoring: combine five signals,
//! measured from the research bundle against the candidate host/category,
//! into a single confidence score.

use std::time::Duration;

use async_trait::async_trait;
use questflow_core::{CancellationToken, OnFail, Phase, PhaseSpec, WorkflowContext};
use questflow_model::{CompanyInput, ResearchBundle};
use questflow_scoring::ambiguity::{combine, AmbiguitySignals, AmbiguityWeights};

use crate::keys;

pub struct AmbiguityScorePhase {
    spec: PhaseSpec,
}

impl AmbiguityScorePhase {
    #[must_use]
    pub fn new() -> Self {
        Self {
            spec: PhaseSpec::new(
                "P_ambiguity",
                vec!["P2_join".into()],
                Duration::from_secs(15),
                OnFail::Fatal,
            ),
        }
    }
}

impl Default for AmbiguityScorePhase {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn signals(input: &CompanyInput, research: &ResearchBundle) -> AmbiguitySignals {
    let items = research.all_citable_items();
    if items.is_empty() {
        return AmbiguitySignals {
            name_url_match: 0.0,
            category_keyword_coverage: 0.0,
            source_cross_consistency: 0.0,
            absence_of_homonym_warnings: 0.5,
            completeness_of_core_fields: 0.0,
        };
    }

    let host_fragment = input.host.split('.').next().unwrap_or(&input.host).to_lowercase();
    let name_hits = items
        .iter()
        .filter(|i| i.title.to_lowercase().contains(&host_fragment) || i.snippet.to_lowercase().contains(&host_fragment))
        .count();
    let name_url_match = (name_hits as f64 / items.len() as f64).min(1.0);

    let category_terms: Vec<String> = input.category.to_lowercase().split_whitespace().map(str::to_string).collect();
    let category_keyword_coverage = if category_terms.is_empty() {
        0.5
    } else {
        let covered = category_terms
            .iter()
            .filter(|term| items.iter().any(|i| i.snippet.to_lowercase().contains(term.as_str())))
            .count();
        covered as f64 / category_terms.len() as f64
    };

    let distinct_with_content = [
        research.get(questflow_model::SourceKind::NewsSearch),
        research.get(questflow_model::SourceKind::DeepResearch),
        research.get(questflow_model::SourceKind::CrawledNews),
        research.get(questflow_model::SourceKind::CrawledAuthoritative),
    ]
    .into_iter()
    .filter(|b| b.is_some_and(|b| !b.is_empty()))
    .count();
    let source_cross_consistency = (distinct_with_content as f64 / 2.0).min(1.0);

    let absence_of_homonym_warnings = if items.len() >= 2 { 1.0 } else { 0.5 };

    let with_full_text = items.iter().filter(|i| i.full_text.is_some()).count();
    let completeness_of_core_fields = with_full_text as f64 / items.len() as f64;

    AmbiguitySignals {
        name_url_match,
        category_keyword_coverage,
        source_cross_consistency,
        absence_of_homonym_warnings,
        completeness_of_core_fields,
    }
}

#[async_trait]
impl Phase for AmbiguityScorePhase {
    fn spec(&self) -> &PhaseSpec {
        &self.spec
    }

    async fn run(&self, ctx: &mut WorkflowContext, _cancel: &CancellationToken) -> questflow_core::Result<()> {
        if crate::already_exited(ctx) {
            return Ok(());
        }
        let input: CompanyInput = ctx
            .get("input")
            .ok_or_else(|| questflow_core::QuestError::Other("ambiguity scoring requires a company input".into()))?;
        let research: ResearchBundle = ctx.get(keys::RESEARCH).unwrap_or_default();

        let confidence = combine(signals(&input, &research), AmbiguityWeights::default());
        ctx.insert(keys::AMBIGUITY, confidence)?;
        Ok(())
    }
}
