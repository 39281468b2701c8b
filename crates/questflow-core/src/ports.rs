//! The external adapter contracts the engine depends on.
//!
//! The core only specifies these interfaces, never their implementations —
//! each is a capability injected into the workflow at startup (a process may
//! initialize a vendor client once, but the capability set itself is
//! declared, not discovered). Concrete adapters live in sibling crates:
//! `questflow-search` (news_search), `questflow-research` (deep_research),
//! `questflow-crawler` (crawler, url_validate), `questflow-llm`
//! (llm_complete), `questflow-imagegen` (image_generate), `questflow-store`
//! (store_upsert), `questflow-graph` (graph_upsert).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One item returned by a search-style adapter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchItem {
    /// Source URL.
    pub url: String,
    /// Title as reported by the source.
    pub title: String,
    /// Short excerpt.
    pub snippet: String,
    /// Full extracted text, when the adapter retrieves it.
    pub full_text: Option<String>,
    /// Publication timestamp, RFC 3339, when known.
    pub published_at: Option<String>,
    /// Adapter-declared confidence in [0, 1].
    pub confidence: f64,
}

/// Request to the `news_search` adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsSearchRequest {
    /// Search query.
    pub query: String,
    /// Optional geo restriction (ISO country code or region).
    pub geo: Option<String>,
    /// Recency window, e.g. `"7d"`, `"30d"`.
    pub time_window: String,
    /// Maximum number of results.
    pub limit: u32,
}

/// Response from the `news_search` adapter.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NewsSearchResponse {
    /// Matching items.
    pub items: Vec<SearchItem>,
}

/// `news_search`: headline/news discovery, one of the four P2 fan-out adapters.
#[async_trait]
pub trait NewsSearchPort: Send + Sync {
    /// Execute a search.
    async fn search(&self, request: NewsSearchRequest) -> crate::Result<NewsSearchResponse>;
}

/// Request to the `deep_research` adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeepResearchRequest {
    /// Topic or entity being researched.
    pub topic: String,
    /// Breadth (number of sources to consider), 3-20.
    pub breadth: u32,
}

/// Response from the `deep_research` adapter: items plus seed URLs the
/// engine may feed to a secondary crawl wave within the same P2 window.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DeepResearchResponse {
    /// Matching items.
    pub items: Vec<SearchItem>,
    /// Seed URLs for secondary crawling.
    pub seeds: Vec<String>,
}

/// `deep_research`: broad multi-source research, may surface crawl seeds.
#[async_trait]
pub trait DeepResearchPort: Send + Sync {
    /// Execute deep research.
    async fn research(&self, request: DeepResearchRequest) -> crate::Result<DeepResearchResponse>;
}

/// Request to the `crawler` adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlRequest {
    /// URL to fetch.
    pub url: String,
    /// Link-following depth from this URL.
    pub depth: u32,
}

/// Response from the `crawler` adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlResponse {
    /// Final URL after redirects.
    pub url: String,
    /// Page title.
    pub title: String,
    /// Extracted main text.
    pub text: String,
    /// Image URLs discovered on the page.
    pub images: Vec<String>,
}

/// `crawler`: single-page fetch-and-extract, used for both direct crawl
/// phases and the deep-research seed-URL secondary wave.
#[async_trait]
pub trait CrawlerPort: Send + Sync {
    /// Crawl a single URL.
    async fn crawl(&self, request: CrawlRequest) -> crate::Result<CrawlResponse>;
}

/// Result of validating a single URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlValidation {
    /// The URL that was checked.
    pub url: String,
    /// HTTP status observed (0 if unreachable).
    pub status: u16,
    /// Final URL after redirects, when different from the input.
    pub final_url: Option<String>,
}

/// `url_validate`: lightweight liveness/redirect check used by P4.
#[async_trait]
pub trait UrlValidatePort: Send + Sync {
    /// Validate a batch of URLs.
    async fn validate(&self, urls: Vec<String>) -> crate::Result<Vec<UrlValidation>>;
}

/// Request to the `llm_complete` adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    /// Rendered prompt.
    pub prompt: String,
    /// JSON schema the response must validate against, for structured output.
    pub schema: Option<serde_json::Value>,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
}

/// Response from the `llm_complete` adapter: either free text or, when a
/// schema was supplied, a validated structured payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LlmResponse {
    /// Free-text completion.
    Text(String),
    /// Schema-validated structured output.
    Structured(serde_json::Value),
}

/// `llm_complete`: the synthesizer's generation backend.
#[async_trait]
pub trait LlmPort: Send + Sync {
    /// Generate a completion.
    async fn complete(&self, request: LlmRequest) -> crate::Result<LlmResponse>;
}

/// Aspect ratio requested for a generated image.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ImageAspect {
    /// 1200x630 featured image.
    Featured,
    /// 16:9 hero image.
    Hero,
    /// 4:3 or 1:1 content image.
    Content,
}

/// Request to the `image_generate` adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageGenerateRequest {
    /// Rendered image prompt.
    pub prompt: String,
    /// Prior image URL used as a style/context reference, for chained
    /// generation consistency.
    pub reference_url: Option<String>,
    /// Requested aspect/shape.
    pub aspect: ImageAspect,
}

/// Response from the `image_generate` adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageGenerateResponse {
    /// Generated image URL.
    pub url: String,
    /// Pixel width.
    pub width: u32,
    /// Pixel height.
    pub height: u32,
    /// Vendor generation seed, used in the fingerprint.
    pub seed: u64,
}

/// `image_generate`: one step of the chained image sequencer.
#[async_trait]
pub trait ImageGeneratePort: Send + Sync {
    /// Generate one image.
    async fn generate(&self, request: ImageGenerateRequest) -> crate::Result<ImageGenerateResponse>;
}

/// Outcome of a `store_upsert` call.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StoreUpsertOutcome {
    /// A new record was created.
    Created,
    /// An existing record was replaced (force_update).
    Updated,
    /// A concurrent writer won the race for this slug.
    Conflict,
}

/// Request to the `store_upsert` adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreUpsertRequest {
    /// Record kind (`"article"` | `"company"`).
    pub kind: String,
    /// Slug, unique within `(app, kind)`.
    pub slug: String,
    /// App tag.
    pub app: String,
    /// Full validated payload, stored as JSON for forward compatibility.
    pub payload: serde_json::Value,
}

/// Response from the `store_upsert` adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreUpsertResponse {
    /// Store-assigned id.
    pub id: String,
    /// What happened.
    pub outcome: StoreUpsertOutcome,
}

/// `store_upsert`: the persistence coordinator's write path, keyed by slug
/// as the idempotency handle.
#[async_trait]
pub trait StorePort: Send + Sync {
    /// Insert-if-absent or update a record.
    async fn upsert(&self, request: StoreUpsertRequest) -> crate::Result<StoreUpsertResponse>;

    /// Compensating delete issued when a later step of an atomic commit
    /// fails after the main record was written.
    async fn delete_by_slug(&self, kind: &str, app: &str, slug: &str) -> crate::Result<()>;

    /// Existence check by `(slug, app)`, used by the deduper. Lock-free.
    async fn exists(&self, kind: &str, app: &str, slug: &str) -> crate::Result<bool>;
}

/// Request to the `graph_upsert` adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphUpsertRequest {
    /// Stable graph id derived from `(slug, app)`.
    pub graph_id: String,
    /// Bounded episode summary (<= 10,000 chars).
    pub episode_text: String,
    /// Related entity links to attach to the episode.
    pub links: Vec<String>,
}

/// Response from the `graph_upsert` adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphUpsertResponse {
    /// The graph id the episode was written under.
    pub graph_id: String,
    /// Number of facts the graph extracted from the episode.
    pub facts_count: u32,
}

/// `graph_upsert`: knowledge-graph episode sync, always soft-skip on failure.
#[async_trait]
pub trait GraphPort: Send + Sync {
    /// Post a summary episode.
    async fn upsert_episode(&self, request: GraphUpsertRequest) -> crate::Result<GraphUpsertResponse>;

    /// Read prior graph context for a slug, used by P3.
    async fn read_context(&self, graph_id: &str) -> crate::Result<Option<String>>;
}
