//! Company workflow: URL → company profile.
//!
//! Compiles the fixed P1 → P2 fan-out/join → ambiguity/re-research →
//! synthesis → images → persistence → backfill → graph-sync phase list and
//! interprets the terminal [`questflow_core::WorkflowOutcome`].

use std::sync::Arc;

use questflow_core::context::WorkflowType;
use questflow_core::{CancellationToken, Phase, WorkflowContext, WorkflowEngine, WorkflowHistory, WorkflowOutcome};
use questflow_model::{CompanyInput, WorkflowResult};

use crate::phases::{
    ambiguity::AmbiguityScorePhase, backfill::BackfillPhase, graph_context::GraphContextPhase,
    graph_sync::GraphSyncPhase, images::ImageSequencerPhase, normalize_company::NormalizeCompanyPhase,
    persistence::PersistencePhase, reresearch::ReresearchPhase, research::*, synthesis_phase::SynthesisPhase,
};
use crate::{keys, DedupeOutcome, Ports};

/// Run the company pipeline for one input. `cancel` lets the caller request
/// cooperative cancellation; the engine observes it at phase boundaries
/// without interrupting an in-flight activity mid-phase.
pub async fn run_company_workflow(ports: &Ports, input: CompanyInput, cancel: &CancellationToken) -> WorkflowResult {
    let workflow_id = uuid::Uuid::new_v4().to_string();
    let input_json = match serde_json::to_value(&input) {
        Ok(v) => v,
        Err(e) => {
            return WorkflowResult::Failed {
                phase: "P1_normalize".to_string(),
                error_kind: "input".to_string(),
                detail: format!("company input not serializable: {e}"),
            }
        }
    };
    let ctx = WorkflowContext::new(workflow_id, WorkflowType::Company, input_json);

    let phases: Vec<Arc<dyn Phase>> = vec![
        Arc::new(NormalizeCompanyPhase::new(Arc::clone(&ports.store))),
        Arc::new(NewsSearchPhase::new(Arc::clone(&ports.news_search))),
        Arc::new(DeepResearchPhase::new(Arc::clone(&ports.deep_research), Arc::clone(&ports.crawler))),
        Arc::new(CrawlPhase::news(Arc::clone(&ports.crawler))),
        Arc::new(CrawlPhase::authoritative(Arc::clone(&ports.crawler))),
        Arc::new(ResearchJoinPhase::new()),
        Arc::new(AmbiguityScorePhase::new()),
        Arc::new(ReresearchPhase::new(Arc::clone(&ports.news_search), Arc::clone(&ports.deep_research), Arc::clone(&ports.config))),
        Arc::new(GraphContextPhase::new(Arc::clone(&ports.graph))),
        Arc::new(SynthesisPhase::company(Arc::clone(&ports.llm))),
        Arc::new(ImageSequencerPhase::company(Arc::clone(&ports.image_generate), Arc::clone(&ports.config))),
        Arc::new(PersistencePhase::company(Arc::clone(&ports.store), Arc::clone(&ports.llm), Arc::clone(&ports.config))),
        Arc::new(BackfillPhase::new()),
        Arc::new(GraphSyncPhase::company(Arc::clone(&ports.graph))),
    ];

    let engine = WorkflowEngine::new();
    let mut history = WorkflowHistory::new();

    match engine.run(&phases, ctx, &mut history, cancel).await {
        WorkflowOutcome::Completed(final_ctx) => interpret_completed(&final_ctx),
        WorkflowOutcome::Failed { phase, error } => {
            WorkflowResult::Failed { phase, error_kind: "fatal".to_string(), detail: error }
        }
        WorkflowOutcome::Cancelled { last_completed_phase } => WorkflowResult::Cancelled { last_completed_phase },
    }
}

fn interpret_completed(ctx: &WorkflowContext) -> WorkflowResult {
    if matches!(ctx.get::<DedupeOutcome>(keys::DEDUPE), Some(DedupeOutcome::Exists)) {
        let slug: String = ctx.get(keys::SLUG).unwrap_or_default();
        return WorkflowResult::Exists { slug };
    }
    ctx.get::<WorkflowResult>(keys::STORE_RESULT).unwrap_or_else(|| WorkflowResult::Failed {
        phase: "P10_persistence".to_string(),
        error_kind: "fatal".to_string(),
        detail: "workflow completed without a store result".to_string(),
    })
}
