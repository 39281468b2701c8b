//! P2: the four-way research fan-out.
//!
//! Each adapter is its own [`questflow_core::Phase`] depending only on
//! `P1_normalize`, so the engine's dependency-readiness scan runs all four
//! concurrently. Every adapter phase is `on_fail: SoftSkip` — an adapter
//! that exhausts its retry budget contributes nothing rather than failing
//! the workflow. [`ResearchJoinPhase`] depends on all four and enforces the
//! "at least one non-empty bundle" partial-ok requirement fatally, since a
//! workflow with zero research has nothing to synthesize from.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use questflow_core::ports::{
    CrawlRequest, CrawlerPort, DeepResearchPort, DeepResearchRequest, NewsSearchPort, NewsSearchRequest, SearchItem,
};
use questflow_core::{CancellationToken, OnFail, Phase, PhaseSpec, QuestError, WorkflowContext};
use questflow_model::{ArticleInput, CompanyInput, ConfidenceScore, ResearchBundle, ResearchItem, SourceBundle, SourceKind};

use crate::keys;

fn confidence_or_zero(raw: f64) -> ConfidenceScore {
    ConfidenceScore::try_new(raw.clamp(0.0, 1.0)).unwrap_or_else(|_| {
        ConfidenceScore::try_new(0.0).expect("0.0 is always a valid confidence score")
    })
}

pub(crate) fn from_search_item(item: SearchItem) -> ResearchItem {
    ResearchItem {
        url: Some(item.url),
        title: item.title,
        snippet: item.snippet,
        full_text: item.full_text,
        published_at: item.published_at,
        confidence: confidence_or_zero(item.confidence),
    }
}

/// Query text shared by the news-search and deep-research adapters: the
/// article topic, or a company's legal-name/category candidate string.
fn query_for(ctx: &WorkflowContext) -> Option<String> {
    if let Some(topic) = ctx.get::<String>(keys::CANONICAL_TOPIC) {
        return Some(topic);
    }
    ctx.get::<CompanyInput>("input").map(|input| format!("{} {}", input.host, input.category))
}

fn now_rfc3339() -> String {
    // The engine never calls `Utc::now()` on replay paths; this is only used
    // as bundle provenance metadata, not as input to any decision.
    chrono::Utc::now().to_rfc3339()
}

pub struct NewsSearchPhase {
    spec: PhaseSpec,
    port: Arc<dyn NewsSearchPort>,
}

impl NewsSearchPhase {
    #[must_use]
    pub fn new(port: Arc<dyn NewsSearchPort>) -> Self {
        Self {
            spec: PhaseSpec::new("P2_news_search", vec!["P1_normalize".into()], Duration::from_secs(120), OnFail::SoftSkip),
            port,
        }
    }
}

#[async_trait]
impl Phase for NewsSearchPhase {
    fn spec(&self) -> &PhaseSpec {
        &self.spec
    }

    async fn run(&self, ctx: &mut WorkflowContext, _cancel: &CancellationToken) -> questflow_core::Result<()> {
        if crate::already_exited(ctx) {
            return Ok(());
        }
        let query = query_for(ctx).ok_or_else(|| QuestError::Other("no query available for news_search".into()))?;

        let response = self
            .port
            .search(NewsSearchRequest { query, geo: None, time_window: "30d".into(), limit: 10 })
            .await?;

        let bundle = SourceBundle {
            retrieved_at: now_rfc3339(),
            origin: "news_search".into(),
            items: response.items.into_iter().map(from_search_item).collect(),
            cost_usd: 0.0,
            latency_ms: 0,
            failure_note: None,
        };
        ctx.insert(keys::BUNDLE_NEWS_SEARCH, bundle)?;
        Ok(())
    }
}

pub struct DeepResearchPhase {
    spec: PhaseSpec,
    port: Arc<dyn DeepResearchPort>,
    crawler: Arc<dyn CrawlerPort>,
}

impl DeepResearchPhase {
    #[must_use]
    pub fn new(port: Arc<dyn DeepResearchPort>, crawler: Arc<dyn CrawlerPort>) -> Self {
        Self {
            spec: PhaseSpec::new("P2_deep_research", vec!["P1_normalize".into()], Duration::from_secs(120), OnFail::SoftSkip),
            port,
            crawler,
        }
    }
}

#[async_trait]
impl Phase for DeepResearchPhase {
    fn spec(&self) -> &PhaseSpec {
        &self.spec
    }

    async fn run(&self, ctx: &mut WorkflowContext, _cancel: &CancellationToken) -> questflow_core::Result<()> {
        if crate::already_exited(ctx) {
            return Ok(());
        }
        let topic = query_for(ctx).ok_or_else(|| QuestError::Other("no topic available for deep_research".into()))?;

        let response = self.port.research(DeepResearchRequest { topic, breadth: 10 }).await?;
        let mut items: Vec<ResearchItem> = response.items.into_iter().map(from_search_item).collect();

        // Secondary crawl wave: a handful of deep-research seeds, crawled
        // within the same P2 window. Best-effort — a seed that
        // fails to crawl is dropped, not propagated.
        for seed in response.seeds.iter().take(3) {
            if let Ok(crawled) = self.crawler.crawl(CrawlRequest { url: seed.clone(), depth: 0 }).await {
                items.push(ResearchItem {
                    url: Some(crawled.url),
                    title: crawled.title,
                    snippet: crawled.text.chars().take(280).collect(),
                    full_text: Some(crawled.text),
                    published_at: None,
                    confidence: confidence_or_zero(0.6),
                });
            }
        }

        let bundle = SourceBundle {
            retrieved_at: now_rfc3339(),
            origin: "deep_research".into(),
            items,
            cost_usd: 0.0,
            latency_ms: 0,
            failure_note: None,
        };
        ctx.insert(keys::BUNDLE_DEEP_RESEARCH, bundle)?;
        Ok(())
    }
}

/// Shared body for the two direct-crawl adapters: article inputs may carry
/// extra URLs to crawl beyond search results; for now this crawls the
/// article's topic-derived seed (when flagged `deep_crawl`) or a company's
/// own homepage.
pub struct CrawlPhase {
    spec: PhaseSpec,
    crawler: Arc<dyn CrawlerPort>,
    bundle_key: &'static str,
    source_kind_label: &'static str,
}

impl CrawlPhase {
    #[must_use]
    pub fn news(crawler: Arc<dyn CrawlerPort>) -> Self {
        Self {
            spec: PhaseSpec::new(
                "P2_crawl_news",
                vec!["P1_normalize".into(), "P2_news_search".into()],
                Duration::from_secs(120),
                OnFail::SoftSkip,
            ),
            crawler,
            bundle_key: keys::BUNDLE_CRAWLED_NEWS,
            source_kind_label: "crawled_news",
        }
    }

    #[must_use]
    pub fn authoritative(crawler: Arc<dyn CrawlerPort>) -> Self {
        Self {
            spec: PhaseSpec::new(
                "P2_crawl_authoritative",
                vec!["P1_normalize".into(), "P2_deep_research".into()],
                Duration::from_secs(120),
                OnFail::SoftSkip,
            ),
            crawler,
            bundle_key: keys::BUNDLE_CRAWLED_AUTHORITATIVE,
            source_kind_label: "crawled_authoritative",
        }
    }

    /// For a company, the subject's own URL is always a crawl target. For
    /// an article, only the top item surfaced by the sibling fan-out phase
    /// this crawl depends on is used — there is no standalone URL on
    /// `ArticleInput` to seed from, and `deep_crawl=false` means skip
    /// entirely.
    fn seed_url(&self, ctx: &WorkflowContext) -> Option<String> {
        if let Some(input) = ctx.get::<CompanyInput>("input") {
            return Some(input.url);
        }
        let input: ArticleInput = ctx.get("input")?;
        if !input.flags.deep_crawl {
            return None;
        }
        let sibling_key = if self.bundle_key == keys::BUNDLE_CRAWLED_NEWS {
            keys::BUNDLE_NEWS_SEARCH
        } else {
            keys::BUNDLE_DEEP_RESEARCH
        };
        ctx.get::<SourceBundle>(sibling_key)?.items.into_iter().find_map(|item| item.url)
    }
}

#[async_trait]
impl Phase for CrawlPhase {
    fn spec(&self) -> &PhaseSpec {
        &self.spec
    }

    async fn run(&self, ctx: &mut WorkflowContext, _cancel: &CancellationToken) -> questflow_core::Result<()> {
        if crate::already_exited(ctx) {
            return Ok(());
        }
        let Some(seed) = self.seed_url(ctx) else {
            ctx.insert(
                self.bundle_key,
                SourceBundle::empty_with_failure(self.source_kind_label, now_rfc3339(), "no seed url for this input"),
            )?;
            return Ok(());
        };

        let crawled = self.crawler.crawl(CrawlRequest { url: seed, depth: 0 }).await?;
        let bundle = SourceBundle {
            retrieved_at: now_rfc3339(),
            origin: self.source_kind_label.into(),
            items: vec![ResearchItem {
                url: Some(crawled.url),
                title: crawled.title,
                snippet: crawled.text.chars().take(280).collect(),
                full_text: Some(crawled.text),
                published_at: None,
                confidence: confidence_or_zero(0.65),
            }],
            cost_usd: 0.0,
            latency_ms: 0,
            failure_note: None,
        };
        ctx.insert(self.bundle_key, bundle)?;
        Ok(())
    }
}

/// Assembles the four `bundle_*` context keys into a single
/// [`ResearchBundle`] at the P2 join point, enforcing "at least one
/// non-empty bundle" fatally.
pub struct ResearchJoinPhase {
    spec: PhaseSpec,
}

impl ResearchJoinPhase {
    #[must_use]
    pub fn new() -> Self {
        Self {
            spec: PhaseSpec::new(
                "P2_join",
                vec![
                    "P2_news_search".into(),
                    "P2_deep_research".into(),
                    "P2_crawl_news".into(),
                    "P2_crawl_authoritative".into(),
                ],
                Duration::from_secs(10),
                OnFail::Fatal,
            ),
        }
    }
}

impl Default for ResearchJoinPhase {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Phase for ResearchJoinPhase {
    fn spec(&self) -> &PhaseSpec {
        &self.spec
    }

    async fn run(&self, ctx: &mut WorkflowContext, _cancel: &CancellationToken) -> questflow_core::Result<()> {
        if crate::already_exited(ctx) {
            return Ok(());
        }

        let mut bundle = ResearchBundle::new();
        for (key, kind) in [
            (keys::BUNDLE_NEWS_SEARCH, SourceKind::NewsSearch),
            (keys::BUNDLE_DEEP_RESEARCH, SourceKind::DeepResearch),
            (keys::BUNDLE_CRAWLED_NEWS, SourceKind::CrawledNews),
            (keys::BUNDLE_CRAWLED_AUTHORITATIVE, SourceKind::CrawledAuthoritative),
        ] {
            if let Some(source_bundle) = ctx.get::<SourceBundle>(key) {
                bundle.set(kind, source_bundle);
            }
        }

        if !bundle.has_any_content() {
            return Err(QuestError::Empty("all four P2 research adapters returned nothing".into()));
        }

        ctx.insert(keys::RESEARCH, bundle)?;
        Ok(())
    }
}
