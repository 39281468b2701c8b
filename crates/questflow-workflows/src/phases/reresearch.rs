//! Company-only conditional re-research: when P_ambiguity's
//! confidence falls below `min_confidence_for_publish`, run one additional,
//! narrowed research pass and recompute. Capped at
//! `config.max_reresearch_attempts` (spec: exactly one). This is a normal
//! DAG node — there is no branching primitive in the engine, so the
//! no-op-when-not-needed check happens inside `run()`, the same pattern as
//! [`crate::already_exited`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use questflow_core::ports::{DeepResearchPort, DeepResearchRequest, NewsSearchPort, NewsSearchRequest};
use questflow_core::{CancellationToken, EngineConfig, OnFail, Phase, PhaseSpec, WorkflowContext, WorkflowEvent};
use questflow_model::{CompanyInput, ConfidenceScore, ResearchBundle, SourceBundle, SourceKind};
use questflow_scoring::ambiguity::{combine, AmbiguityWeights};

use crate::keys;

pub struct ReresearchPhase {
    spec: PhaseSpec,
    news_search: Arc<dyn NewsSearchPort>,
    deep_research: Arc<dyn DeepResearchPort>,
    config: Arc<EngineConfig>,
}

impl ReresearchPhase {
    #[must_use]
    pub fn new(news_search: Arc<dyn NewsSearchPort>, deep_research: Arc<dyn DeepResearchPort>, config: Arc<EngineConfig>) -> Self {
        Self {
            spec: PhaseSpec::new(
                "P_reresearch",
                vec!["P_ambiguity".into()],
                Duration::from_secs(120),
                OnFail::SoftSkip,
            ),
            news_search,
            deep_research,
            config,
        }
    }
}

#[async_trait]
impl Phase for ReresearchPhase {
    fn spec(&self) -> &PhaseSpec {
        &self.spec
    }

    async fn run(&self, ctx: &mut WorkflowContext, _cancel: &CancellationToken) -> questflow_core::Result<()> {
        if crate::already_exited(ctx) {
            return Ok(());
        }
        let confidence: ConfidenceScore = ctx.get(keys::AMBIGUITY).unwrap_or(ConfidenceScore::try_new(1.0).expect("1.0 is valid"));

        if !self.config.rescrape_on_low_confidence
            || self.config.max_reresearch_attempts == 0
            || confidence.value() >= self.config.min_confidence_for_publish
        {
            return Ok(());
        }

        let input: CompanyInput = ctx
            .get("input")
            .ok_or_else(|| questflow_core::QuestError::Other("re-research requires a company input".into()))?;
        let narrowed_query = format!("{} {} official", input.host, input.category);

        let mut research: ResearchBundle = ctx.get(keys::RESEARCH).unwrap_or_default();

        // Re-research replaces rather than merges with the original bundle:
        // the narrowed query targets a different, more specific result set,
        // and folding the two together would make the resulting confidence
        // depend on fan-out ordering instead of the narrowed query alone.
        if let Ok(response) = self
            .news_search
            .search(NewsSearchRequest { query: narrowed_query.clone(), geo: None, time_window: "90d".into(), limit: 10 })
            .await
        {
            let bundle = SourceBundle {
                retrieved_at: "unknown".to_string(),
                origin: "news_search".to_string(),
                items: response.items.into_iter().map(super::research::from_search_item).collect(),
                cost_usd: 0.0,
                latency_ms: 0,
                failure_note: None,
            };
            research.set(SourceKind::NewsSearch, bundle);
        }

        if let Ok(response) = self.deep_research.research(DeepResearchRequest { topic: narrowed_query, breadth: 10 }).await {
            let bundle = SourceBundle {
                retrieved_at: "unknown".to_string(),
                origin: "deep_research".to_string(),
                items: response.items.into_iter().map(super::research::from_search_item).collect(),
                cost_usd: 0.0,
                latency_ms: 0,
                failure_note: None,
            };
            research.set(SourceKind::DeepResearch, bundle);
        }

        let new_confidence = combine(super::ambiguity::signals(&input, &research), AmbiguityWeights::default());

        ctx.compensate(keys::RESEARCH, &research)?;
        ctx.compensate(keys::AMBIGUITY, new_confidence)?;
        ctx.record_event(WorkflowEvent::new(
            "P_reresearch",
            "reresearch_triggered",
            format!("confidence {:.2} -> {:.2}", confidence.value(), new_confidence.value()),
        ));

        if new_confidence.value() < self.config.min_confidence_for_publish {
            ctx.record_event(WorkflowEvent::new(
                "P_reresearch",
                "ambiguity_unresolved",
                format!("confidence {:.2} remained below threshold {:.2} after re-research", new_confidence.value(), self.config.min_confidence_for_publish),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use questflow_core::context::WorkflowType;
    use questflow_core::ports::NewsSearchResponse;
    use questflow_model::{AppTag, CompanyInput};
    use questflow_testing::{MockDeepResearchPort, MockNewsSearchPort};

    use super::*;

    fn company_input() -> CompanyInput {
        CompanyInput::try_new("https://thrivealts.com", "placement_agent", AppTag::Placement).unwrap()
    }

    fn ctx_with(confidence: f64) -> WorkflowContext {
        let mut ctx = WorkflowContext::new("wf-1", WorkflowType::Company, serde_json::to_value(company_input()).unwrap());
        ctx.insert("input", company_input()).unwrap();
        ctx.insert(keys::AMBIGUITY, ConfidenceScore::try_new(confidence).unwrap()).unwrap();
        ctx
    }

    /// Invariant 9: below-threshold confidence triggers exactly one
    /// re-research wave, never zero and never more than one.
    #[tokio::test]
    async fn below_threshold_confidence_triggers_exactly_one_reresearch() {
        let news_search = Arc::new(MockNewsSearchPort::new().with_response(NewsSearchResponse {
            items: vec![questflow_core::ports::SearchItem {
                url: "https://thrivealts.com/about".into(),
                title: "Thrive Alts official".into(),
                snippet: "placement agent official registry".into(),
                full_text: None,
                published_at: None,
                confidence: 0.9,
            }],
        }));
        let deep_research = Arc::new(MockDeepResearchPort::new());
        let config = Arc::new(EngineConfig::default());
        let phase = ReresearchPhase::new(Arc::clone(&news_search) as Arc<dyn NewsSearchPort>, Arc::clone(&deep_research) as Arc<dyn DeepResearchPort>, config);

        let mut ctx = ctx_with(0.58);
        phase.run(&mut ctx, &CancellationToken::new()).await.unwrap();

        assert_eq!(news_search.call_count(), 1);
        assert_eq!(deep_research.call_count(), 1);
        assert!(ctx.events().iter().any(|e| e.code == "reresearch_triggered"));
        let updated: ConfidenceScore = ctx.get(keys::AMBIGUITY).unwrap();
        assert!(updated.value() > 0.58, "confidence should improve after re-research, got {}", updated.value());
    }

    #[tokio::test]
    async fn confidence_already_above_threshold_skips_reresearch() {
        let news_search = Arc::new(MockNewsSearchPort::new());
        let deep_research = Arc::new(MockDeepResearchPort::new());
        let config = Arc::new(EngineConfig::default());
        let phase = ReresearchPhase::new(Arc::clone(&news_search) as Arc<dyn NewsSearchPort>, Arc::clone(&deep_research) as Arc<dyn DeepResearchPort>, config);

        let mut ctx = ctx_with(0.83);
        phase.run(&mut ctx, &CancellationToken::new()).await.unwrap();

        assert_eq!(news_search.call_count(), 0);
        assert_eq!(deep_research.call_count(), 0);
    }

    #[tokio::test]
    async fn rescrape_disabled_skips_reresearch_even_when_ambiguous() {
        let news_search = Arc::new(MockNewsSearchPort::new());
        let deep_research = Arc::new(MockDeepResearchPort::new());
        let mut config = EngineConfig::default();
        config.rescrape_on_low_confidence = false;
        let phase = ReresearchPhase::new(
            Arc::clone(&news_search) as Arc<dyn NewsSearchPort>,
            Arc::clone(&deep_research) as Arc<dyn DeepResearchPort>,
            Arc::new(config),
        );

        let mut ctx = ctx_with(0.4);
        phase.run(&mut ctx, &CancellationToken::new()).await.unwrap();

        assert_eq!(news_search.call_count(), 0);
        assert_eq!(deep_research.call_count(), 0);
    }
}
