//! Capability bundle injected into a workflow run.
//!
//! Vendor clients become a declared capability set: the caller constructs
//! one vendor client per adapter at process startup and hands the whole
//! bundle to [`crate::run_article_workflow`]/[`crate::run_company_workflow`],
//! rather than phases reaching for a process-global client.

use std::sync::Arc;

use questflow_core::ports::{
    CrawlerPort, DeepResearchPort, GraphPort, ImageGeneratePort, LlmPort, NewsSearchPort, StorePort,
    UrlValidatePort,
};
use questflow_core::EngineConfig;

/// The full set of external capabilities a workflow run depends on.
///
/// Cloning a `Ports` is cheap (every field is an `Arc`); each phase struct
/// holds only the subset of ports it actually calls, cloned out of this
/// bundle when the phase list is compiled.
#[derive(Clone)]
pub struct Ports {
    pub news_search: Arc<dyn NewsSearchPort>,
    pub deep_research: Arc<dyn DeepResearchPort>,
    pub crawler: Arc<dyn CrawlerPort>,
    pub url_validate: Arc<dyn UrlValidatePort>,
    pub llm: Arc<dyn LlmPort>,
    pub image_generate: Arc<dyn ImageGeneratePort>,
    pub store: Arc<dyn StorePort>,
    pub graph: Arc<dyn GraphPort>,
    pub config: Arc<EngineConfig>,
}
