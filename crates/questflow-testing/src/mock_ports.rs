//! Configurable mock adapters, one per [`questflow_core::ports`] trait.
//!
//! Each mock follows the same shape: a fixed default response, an optional
//! handler closure for input-dependent behavior, a call history for
//! assertions, and a one-shot `fail_next` for exercising retry/soft-skip
//! paths. [`MockStorePort`] and [`MockGraphPort`] additionally back their
//! calls with an in-memory table so `exists`/`delete_by_slug` and
//! `read_context` observe prior `upsert`/`upsert_episode` calls.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use questflow_core::ports::{
    CrawlRequest, CrawlResponse, CrawlerPort, DeepResearchPort, DeepResearchRequest, DeepResearchResponse,
    GraphPort, GraphUpsertRequest, GraphUpsertResponse, ImageGeneratePort, ImageGenerateRequest,
    ImageGenerateResponse, LlmPort, LlmRequest, LlmResponse, NewsSearchPort, NewsSearchRequest, NewsSearchResponse,
    StorePort, StoreUpsertOutcome, StoreUpsertRequest, StoreUpsertResponse, UrlValidatePort, UrlValidation,
};
use questflow_core::QuestError;

type Handler<Req, Resp> = Arc<dyn Fn(&Req) -> questflow_core::Result<Resp> + Send + Sync>;

/// Shared call-tracking and one-shot-failure bookkeeping, generalized from
/// the single-tool pattern to every adapter in this crate.
struct Recorder<Req> {
    history: Arc<Mutex<Vec<Req>>>,
    should_fail: Arc<Mutex<Option<String>>>,
}

impl<Req: Clone> Recorder<Req> {
    fn new() -> Self {
        Self { history: Arc::new(Mutex::new(Vec::new())), should_fail: Arc::new(Mutex::new(None)) }
    }

    fn record(&self, req: &Req) {
        self.history.lock().unwrap().push(req.clone());
    }

    fn take_failure(&self) -> Option<String> {
        self.should_fail.lock().unwrap().take()
    }

    fn fail_next(&self, message: impl Into<String>) {
        *self.should_fail.lock().unwrap() = Some(message.into());
    }

    fn call_count(&self) -> usize {
        self.history.lock().unwrap().len()
    }

    fn calls(&self) -> Vec<Req> {
        self.history.lock().unwrap().clone()
    }

    fn reset(&self) {
        self.history.lock().unwrap().clear();
        *self.should_fail.lock().unwrap() = None;
    }
}

impl<Req> Clone for Recorder<Req> {
    fn clone(&self) -> Self {
        Self { history: Arc::clone(&self.history), should_fail: Arc::clone(&self.should_fail) }
    }
}

macro_rules! mock_port {
    ($name:ident, $trait_:ident, $method:ident, $req:ty, $resp:ty, $default:expr) => {
        #[doc = concat!("Mock [`", stringify!($trait_), "`].")]
        pub struct $name {
            recorder: Recorder<$req>,
            handler: Mutex<Option<Handler<$req, $resp>>>,
            response: Mutex<$resp>,
        }

        impl $name {
            /// Create a mock that returns a blank default response.
            #[must_use]
            pub fn new() -> Self {
                Self { recorder: Recorder::new(), handler: Mutex::new(None), response: Mutex::new($default) }
            }

            /// Always return this fixed response (unless a handler is set).
            #[must_use]
            pub fn with_response(self, response: $resp) -> Self {
                *self.response.lock().unwrap() = response;
                self
            }

            /// Compute the response from the request.
            #[must_use]
            pub fn with_handler<F>(self, handler: F) -> Self
            where
                F: Fn(&$req) -> questflow_core::Result<$resp> + Send + Sync + 'static,
            {
                *self.handler.lock().unwrap() = Some(Arc::new(handler));
                self
            }

            /// Fail the next call with the given error message.
            pub fn fail_next(&self, message: impl Into<String>) {
                self.recorder.fail_next(message);
            }

            /// Number of calls received so far.
            #[must_use]
            pub fn call_count(&self) -> usize {
                self.recorder.call_count()
            }

            /// All requests received so far, in order.
            #[must_use]
            pub fn calls(&self) -> Vec<$req> {
                self.recorder.calls()
            }

            /// Clear call history and any pending failure.
            pub fn reset(&self) {
                self.recorder.reset();
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        #[async_trait]
        impl $trait_ for $name {
            async fn $method(&self, request: $req) -> questflow_core::Result<$resp> {
                self.recorder.record(&request);
                if let Some(message) = self.recorder.take_failure() {
                    return Err(QuestError::Other(message));
                }
                if let Some(handler) = self.handler.lock().unwrap().as_ref() {
                    return handler(&request);
                }
                Ok(self.response.lock().unwrap().clone())
            }
        }
    };
}

mock_port!(
    MockNewsSearchPort,
    NewsSearchPort,
    search,
    NewsSearchRequest,
    NewsSearchResponse,
    NewsSearchResponse::default()
);

mock_port!(
    MockDeepResearchPort,
    DeepResearchPort,
    research,
    DeepResearchRequest,
    DeepResearchResponse,
    DeepResearchResponse::default()
);

mock_port!(
    MockCrawlerPort,
    CrawlerPort,
    crawl,
    CrawlRequest,
    CrawlResponse,
    CrawlResponse { url: String::new(), title: String::new(), text: String::new(), images: Vec::new() }
);

mock_port!(
    MockLlmPort,
    LlmPort,
    complete,
    LlmRequest,
    LlmResponse,
    LlmResponse::Text(String::new())
);

mock_port!(
    MockImageGeneratePort,
    ImageGeneratePort,
    generate,
    ImageGenerateRequest,
    ImageGenerateResponse,
    ImageGenerateResponse { url: "https://example.test/image.png".to_string(), width: 1200, height: 630, seed: 0 }
);

/// Mock [`UrlValidatePort`]. Validates every URL as HTTP 200 by default;
/// `with_status` overrides the status returned for a specific URL.
pub struct MockUrlValidatePort {
    recorder: Recorder<Vec<String>>,
    statuses: Mutex<HashMap<String, u16>>,
}

impl MockUrlValidatePort {
    /// Create a mock that reports every URL as live (200).
    #[must_use]
    pub fn new() -> Self {
        Self { recorder: Recorder::new(), statuses: Mutex::new(HashMap::new()) }
    }

    /// Override the status reported for `url`.
    #[must_use]
    pub fn with_status(self, url: impl Into<String>, status: u16) -> Self {
        self.statuses.lock().unwrap().insert(url.into(), status);
        self
    }

    /// Fail the next call with the given error message.
    pub fn fail_next(&self, message: impl Into<String>) {
        self.recorder.fail_next(message);
    }

    /// Number of calls received so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.recorder.call_count()
    }
}

impl Default for MockUrlValidatePort {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UrlValidatePort for MockUrlValidatePort {
    async fn validate(&self, urls: Vec<String>) -> questflow_core::Result<Vec<UrlValidation>> {
        self.recorder.record(&urls);
        if let Some(message) = self.recorder.take_failure() {
            return Err(QuestError::Other(message));
        }
        let statuses = self.statuses.lock().unwrap();
        Ok(urls
            .into_iter()
            .map(|url| {
                let status = statuses.get(&url).copied().unwrap_or(200);
                UrlValidation { url, status, final_url: None }
            })
            .collect())
    }
}

/// Mock [`StorePort`] backed by an in-memory `(kind, app, slug) -> payload`
/// table, so `exists`/`delete_by_slug` observe prior `upsert` calls the way
/// a real store would.
pub struct MockStorePort {
    records: Mutex<HashMap<(String, String, String), serde_json::Value>>,
    recorder: Recorder<StoreUpsertRequest>,
    force_conflict: Mutex<bool>,
    next_id: Mutex<u64>,
}

impl MockStorePort {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            recorder: Recorder::new(),
            force_conflict: Mutex::new(false),
            next_id: Mutex::new(1),
        }
    }

    /// Force the next `upsert` to report a slug conflict, as if a concurrent
    /// writer won the race.
    pub fn force_next_conflict(&self) {
        *self.force_conflict.lock().unwrap() = true;
    }

    /// Fail the next call with the given error message.
    pub fn fail_next(&self, message: impl Into<String>) {
        self.recorder.fail_next(message);
    }

    /// Number of `upsert` calls received so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.recorder.call_count()
    }

    /// Stored payload for `(kind, app, slug)`, if any.
    #[must_use]
    pub fn get(&self, kind: &str, app: &str, slug: &str) -> Option<serde_json::Value> {
        self.records.lock().unwrap().get(&(kind.to_string(), app.to_string(), slug.to_string())).cloned()
    }
}

impl Default for MockStorePort {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorePort for MockStorePort {
    async fn upsert(&self, request: StoreUpsertRequest) -> questflow_core::Result<StoreUpsertResponse> {
        self.recorder.record(&request);
        if let Some(message) = self.recorder.take_failure() {
            return Err(QuestError::Other(message));
        }
        let mut conflict = self.force_conflict.lock().unwrap();
        if *conflict {
            *conflict = false;
            return Ok(StoreUpsertResponse { id: String::new(), outcome: StoreUpsertOutcome::Conflict });
        }
        drop(conflict);

        let key = (request.kind, request.app, request.slug);
        let mut records = self.records.lock().unwrap();
        let existed = records.contains_key(&key);
        records.insert(key, request.payload);
        let mut next_id = self.next_id.lock().unwrap();
        let id = *next_id;
        *next_id += 1;
        Ok(StoreUpsertResponse {
            id: id.to_string(),
            outcome: if existed { StoreUpsertOutcome::Updated } else { StoreUpsertOutcome::Created },
        })
    }

    async fn delete_by_slug(&self, kind: &str, app: &str, slug: &str) -> questflow_core::Result<()> {
        self.records.lock().unwrap().remove(&(kind.to_string(), app.to_string(), slug.to_string()));
        Ok(())
    }

    async fn exists(&self, kind: &str, app: &str, slug: &str) -> questflow_core::Result<bool> {
        Ok(self.records.lock().unwrap().contains_key(&(kind.to_string(), app.to_string(), slug.to_string())))
    }
}

/// Mock [`GraphPort`] backed by an in-memory `graph_id -> episode_text`
/// table, so `read_context` observes prior `upsert_episode` calls.
pub struct MockGraphPort {
    episodes: Mutex<HashMap<String, String>>,
    recorder: Recorder<GraphUpsertRequest>,
    facts_per_call: Mutex<u32>,
}

impl MockGraphPort {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self { episodes: Mutex::new(HashMap::new()), recorder: Recorder::new(), facts_per_call: Mutex::new(3) }
    }

    /// Seed `read_context` to return `text` for `graph_id` before any
    /// `upsert_episode` call.
    #[must_use]
    pub fn with_context(self, graph_id: impl Into<String>, text: impl Into<String>) -> Self {
        self.episodes.lock().unwrap().insert(graph_id.into(), text.into());
        self
    }

    /// Number of facts `upsert_episode` reports extracting.
    #[must_use]
    pub fn with_facts_per_call(self, count: u32) -> Self {
        *self.facts_per_call.lock().unwrap() = count;
        self
    }

    /// Fail the next call with the given error message.
    pub fn fail_next(&self, message: impl Into<String>) {
        self.recorder.fail_next(message);
    }

    /// Number of `upsert_episode` calls received so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.recorder.call_count()
    }
}

impl Default for MockGraphPort {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GraphPort for MockGraphPort {
    async fn upsert_episode(&self, request: GraphUpsertRequest) -> questflow_core::Result<GraphUpsertResponse> {
        self.recorder.record(&request);
        if let Some(message) = self.recorder.take_failure() {
            return Err(QuestError::Other(message));
        }
        let facts_count = *self.facts_per_call.lock().unwrap();
        self.episodes.lock().unwrap().insert(request.graph_id.clone(), request.episode_text);
        Ok(GraphUpsertResponse { graph_id: request.graph_id, facts_count })
    }

    async fn read_context(&self, graph_id: &str) -> questflow_core::Result<Option<String>> {
        Ok(self.episodes.lock().unwrap().get(graph_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn news_search_returns_default_then_handler_override() {
        let mock = MockNewsSearchPort::new();
        let response = mock
            .search(NewsSearchRequest { query: "q".into(), geo: None, time_window: "7d".into(), limit: 5 })
            .await
            .unwrap();
        assert!(response.items.is_empty());
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn fail_next_is_one_shot() {
        let mock = MockLlmPort::new();
        mock.fail_next("vendor outage");
        let err = mock.complete(LlmRequest { prompt: "p".into(), schema: None, max_tokens: 10 }).await;
        assert!(err.is_err());
        let ok = mock.complete(LlmRequest { prompt: "p".into(), schema: None, max_tokens: 10 }).await;
        assert!(ok.is_ok());
    }

    #[tokio::test]
    async fn store_upsert_then_exists_and_delete() {
        let store = MockStorePort::new();
        let request = StoreUpsertRequest {
            kind: "article".into(),
            slug: "s".into(),
            app: "relocation".into(),
            payload: serde_json::json!({"title": "t"}),
        };
        let response = store.upsert(request.clone()).await.unwrap();
        assert_eq!(response.outcome, StoreUpsertOutcome::Created);
        assert!(store.exists("article", "relocation", "s").await.unwrap());

        let response = store.upsert(request).await.unwrap();
        assert_eq!(response.outcome, StoreUpsertOutcome::Updated);

        store.delete_by_slug("article", "relocation", "s").await.unwrap();
        assert!(!store.exists("article", "relocation", "s").await.unwrap());
    }

    #[tokio::test]
    async fn store_force_conflict_is_one_shot() {
        let store = MockStorePort::new();
        store.force_next_conflict();
        let request = StoreUpsertRequest {
            kind: "article".into(),
            slug: "s".into(),
            app: "relocation".into(),
            payload: serde_json::json!({}),
        };
        let response = store.upsert(request.clone()).await.unwrap();
        assert_eq!(response.outcome, StoreUpsertOutcome::Conflict);
        let response = store.upsert(request).await.unwrap();
        assert_eq!(response.outcome, StoreUpsertOutcome::Created);
    }

    #[tokio::test]
    async fn graph_read_context_sees_prior_upsert() {
        let graph = MockGraphPort::new();
        assert!(graph.read_context("relocation:s").await.unwrap().is_none());
        graph
            .upsert_episode(GraphUpsertRequest {
                graph_id: "relocation:s".into(),
                episode_text: "summary".into(),
                links: vec![],
            })
            .await
            .unwrap();
        assert_eq!(graph.read_context("relocation:s").await.unwrap().as_deref(), Some("summary"));
    }

    #[tokio::test]
    async fn url_validate_reports_overridden_status() {
        let validator = MockUrlValidatePort::new().with_status("https://dead.example", 404);
        let results = validator
            .validate(vec!["https://dead.example".to_string(), "https://live.example".to_string()])
            .await
            .unwrap();
        assert_eq!(results[0].status, 404);
        assert_eq!(results[1].status, 200);
    }
}
