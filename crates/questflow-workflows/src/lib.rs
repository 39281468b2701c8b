//! Article and company workflow definitions for the QuestFlow content
//! pipeline: phase tables, research fan-out, the image sequencer, entity
//! linking, the persistence coordinator, and graph sync.
//!
//! This crate wires `questflow-core`'s generic phase/activity engine to a
//! concrete set of capabilities (the `Ports` bundle) and exposes two entry
//! points, [`run_article_workflow`] and [`run_company_workflow`], each of
//! which compiles a fixed phase list and interprets the engine's terminal
//! [`questflow_core::WorkflowOutcome`] into a [`questflow_model::WorkflowResult`].

mod article;
mod company;
mod fingerprint;
mod ports;
mod synthesis;
mod textsim;

pub mod phases;

pub use article::run_article_workflow;
pub use company::run_company_workflow;
pub use ports::Ports;

use serde::{Deserialize, Serialize};

/// Result of P1's existence check against the store.
///
/// `New` and `Update` both let the workflow proceed to persistence; `Exists`
/// short-circuits every phase from P2 onward (see [`already_exited`]) as an
/// `EXISTS/EXIT` outcome — nothing downstream should spend activity budget
/// on a run that will not persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) enum DedupeOutcome {
    /// No record at this (app, kind, slug) yet.
    New,
    /// A record exists and the input authorizes replacing it
    /// (`CompanyInput::force_update`); the article workflow never produces
    /// this variant since `ArticleInput` has no force flag.
    Update,
    /// A record exists and nothing authorizes touching it.
    Exists,
}

/// Context field keys shared by both workflows. Centralized so a typo in a
/// key string is a single-location fix rather than a silent mismatch
/// between the phase that writes a field and the phase that reads it.
pub(crate) mod keys {
    pub const SLUG: &str = "slug";
    pub const DEDUPE: &str = "dedupe";
    pub const CANONICAL_TOPIC: &str = "canonical_topic";
    pub const CANONICAL_URL: &str = "canonical_url";
    pub const BUNDLE_NEWS_SEARCH: &str = "bundle_news_search";
    pub const BUNDLE_DEEP_RESEARCH: &str = "bundle_deep_research";
    pub const BUNDLE_CRAWLED_NEWS: &str = "bundle_crawled_news";
    pub const BUNDLE_CRAWLED_AUTHORITATIVE: &str = "bundle_crawled_authoritative";
    pub const RESEARCH: &str = "research";
    pub const GRAPH_CONTEXT: &str = "graph_context";
    pub const URL_VALIDATIONS: &str = "url_validations";
    pub const AMBIGUITY: &str = "ambiguity";
    pub const PAYLOAD: &str = "payload";
    pub const SENTIMENTS: &str = "sentiments";
    pub const VALIDATED_SOURCE_URLS: &str = "validated_source_urls";
    pub const IMAGES: &str = "images";
    pub const ENTITIES: &str = "entities";
    pub const STORE_RESULT: &str = "store_result";
    pub const COMPLETENESS: &str = "completeness";
    pub const GRAPH_SYNC: &str = "graph_sync";
}

/// Whether the workflow already resolved to a terminal pre-existing-record
/// status at P1 and every later phase should no-op rather than spend
/// activity budget on a run that will not persist anything. Re-checked at
/// the top of every phase from P2 onward.
pub(crate) fn already_exited(ctx: &questflow_core::WorkflowContext) -> bool {
    matches!(ctx.get::<DedupeOutcome>(keys::DEDUPE), Some(DedupeOutcome::Exists))
}

/// The `app_tag` string for either workflow variant, read back out of the
/// context's original `input` field.
pub(crate) fn app_tag_of(ctx: &questflow_core::WorkflowContext) -> &'static str {
    if let Some(input) = ctx.get::<questflow_model::ArticleInput>("input") {
        return input.app_tag.as_str();
    }
    ctx.get::<questflow_model::CompanyInput>("input")
        .map(|input| input.app_tag.as_str())
        .unwrap_or("unknown")
}

/// Whether this run should skip both the P3 graph-context read and the
/// final graph-sync write. Only articles carry this flag
/// (`ArticleFlags::skip_graph_sync`); companies always sync.
pub(crate) fn skip_graph_sync(ctx: &questflow_core::WorkflowContext) -> bool {
    ctx.get::<questflow_model::ArticleInput>("input")
        .map(|input| input.flags.skip_graph_sync)
        .unwrap_or(false)
}
