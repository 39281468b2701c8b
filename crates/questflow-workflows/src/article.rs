//! Article workflow: topic → published or draft article.
//!
//! Compiles the fixed P1-P11 phase list, runs it through
//! [`questflow_core::WorkflowEngine`], and interprets the terminal
//! [`questflow_core::WorkflowOutcome`] into a [`WorkflowResult`].

use std::sync::Arc;

use questflow_core::context::WorkflowType;
use questflow_core::{CancellationToken, Phase, WorkflowContext, WorkflowEngine, WorkflowHistory, WorkflowOutcome};
use questflow_model::{ArticleInput, WorkflowResult};

use crate::phases::{
    entities::EntityLinkPhase, graph_context::GraphContextPhase, graph_sync::GraphSyncPhase,
    images::ImageSequencerPhase, link_cleanse::LinkCleansePhase, normalize_article::NormalizeArticlePhase,
    persistence::PersistencePhase, research::*, sentiment::SentimentPhase, synthesis_phase::SynthesisPhase,
    url_validate::UrlValidatePhase,
};
use crate::{keys, DedupeOutcome, Ports};

/// Run the article pipeline for one input.
///
/// `company_directory` is the entity linker's candidate set
/// (`(slug, display_name, domain)`), sourced by the caller — the workflow
/// crate has no port capable of listing the company directory itself (see
/// [`crate::phases::entities`]). `cancel` lets the caller request
/// cooperative cancellation; the engine observes it at phase boundaries
/// without interrupting an in-flight activity mid-phase.
pub async fn run_article_workflow(
    ports: &Ports,
    input: ArticleInput,
    company_directory: Vec<(String, String, Option<String>)>,
    cancel: &CancellationToken,
) -> WorkflowResult {
    let workflow_id = uuid::Uuid::new_v4().to_string();
    let input_json = match serde_json::to_value(&input) {
        Ok(v) => v,
        Err(e) => {
            return WorkflowResult::Failed {
                phase: "P1_normalize".to_string(),
                error_kind: "input".to_string(),
                detail: format!("article input not serializable: {e}"),
            }
        }
    };
    let ctx = WorkflowContext::new(workflow_id, WorkflowType::Article, input_json);

    let phases: Vec<Arc<dyn Phase>> = vec![
        Arc::new(NormalizeArticlePhase::new(Arc::clone(&ports.store))),
        Arc::new(NewsSearchPhase::new(Arc::clone(&ports.news_search))),
        Arc::new(DeepResearchPhase::new(Arc::clone(&ports.deep_research), Arc::clone(&ports.crawler))),
        Arc::new(CrawlPhase::news(Arc::clone(&ports.crawler))),
        Arc::new(CrawlPhase::authoritative(Arc::clone(&ports.crawler))),
        Arc::new(ResearchJoinPhase::new()),
        Arc::new(GraphContextPhase::new(Arc::clone(&ports.graph))),
        Arc::new(SynthesisPhase::article(Arc::clone(&ports.llm))),
        Arc::new(SentimentPhase::new()),
        Arc::new(UrlValidatePhase::new(Arc::clone(&ports.url_validate))),
        Arc::new(LinkCleansePhase::new()),
        Arc::new(ImageSequencerPhase::article(Arc::clone(&ports.image_generate), Arc::clone(&ports.config))),
        Arc::new(EntityLinkPhase::new(company_directory)),
        Arc::new(PersistencePhase::article(Arc::clone(&ports.store), Arc::clone(&ports.llm), Arc::clone(&ports.config))),
        Arc::new(GraphSyncPhase::article(Arc::clone(&ports.graph))),
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
