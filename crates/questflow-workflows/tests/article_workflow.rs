//! End-to-end article workflow tests against the full P1-P11 phase chain,
//! wired with `questflow-testing` mocks instead of real vendor clients.

use std::sync::Arc;

use questflow_core::ports::{DeepResearchResponse, NewsSearchResponse, SearchItem};
use questflow_core::{CancellationToken, EngineConfig};
use questflow_model::{ArticleFormat, ArticleInput, AppTag, WorkflowResult};
use questflow_testing::{
    MockCrawlerPort, MockDeepResearchPort, MockGraphPort, MockImageGeneratePort, MockLlmPort, MockNewsSearchPort,
    MockStorePort, MockUrlValidatePort,
};
use questflow_workflows::Ports;

fn filler(words: usize) -> String {
    vec!["substantive"; words].join(" ")
}

fn article_response() -> serde_json::Value {
    serde_json::json!({
        "title": "Digital Nomad Visa Greece: A Complete Guide",
        "subtitle": "What applicants need to know before they apply",
        "classification": "guide",
        "tags": ["greece", "digital-nomad", "visa"],
        "meta_description": "A guide to Greece's digital nomad visa requirements.",
        "sections": [
            {"h2_title": "Eligibility", "body": filler(260), "source_urls": ["https://example.test/news-1"]},
            {"h2_title": "Application process", "body": filler(260), "source_urls": ["https://example.test/deep-1"]},
            {"h2_title": "Tax implications", "body": filler(260), "source_urls": ["https://example.test/deep-2"]},
            {"h2_title": "Cost of living", "body": filler(260), "source_urls": ["https://example.test/news-1"]},
            {"h2_title": "Renewal and long-term residency", "body": filler(260), "source_urls": ["https://example.test/deep-1"]},
        ],
    })
}

fn news_search_mock() -> MockNewsSearchPort {
    MockNewsSearchPort::new().with_response(NewsSearchResponse {
        items: vec![SearchItem {
            url: "https://example.test/news-1".into(),
            title: "Greece expands digital nomad visa program".into(),
            snippet: "Greece's digital nomad visa saw record applications this year.".into(),
            full_text: None,
            published_at: None,
            confidence: 0.8,
        }],
    })
}

fn deep_research_mock() -> MockDeepResearchPort {
    MockDeepResearchPort::new().with_response(DeepResearchResponse {
        items: vec![
            SearchItem {
                url: "https://example.test/deep-1".into(),
                title: "Ministry guidance on remote worker visas".into(),
                snippet: "Official application steps and required documents.".into(),
                full_text: None,
                published_at: None,
                confidence: 0.85,
            },
            SearchItem {
                url: "https://example.test/deep-2".into(),
                title: "Tax treatment of digital nomad visa holders".into(),
                snippet: "Non-domicile tax regime details for remote workers.".into(),
                full_text: None,
                published_at: None,
                confidence: 0.75,
            },
        ],
        seeds: vec![],
    })
}

fn article_input() -> ArticleInput {
    ArticleInput::try_new("Digital Nomad Visa Greece", AppTag::Relocation, Some(1500), ArticleFormat::Guide, 8).unwrap()
}

/// E1: a full happy-path run with every P2 adapter returning usable content
/// produces a created record, synced to the graph, with no below-floor
/// draft fallback.
#[tokio::test]
async fn happy_path_article_run_is_created_and_graph_synced() {
    let store = Arc::new(MockStorePort::new());
    let graph = Arc::new(MockGraphPort::new());
    let llm = Arc::new(MockLlmPort::new().with_handler(|_req| {
        Ok(questflow_core::ports::LlmResponse::Structured(article_response()))
    }));

    let ports = Ports {
        news_search: Arc::new(news_search_mock()),
        deep_research: Arc::new(deep_research_mock()),
        crawler: Arc::new(MockCrawlerPort::new()),
        url_validate: Arc::new(MockUrlValidatePort::new()),
        llm,
        image_generate: Arc::new(MockImageGeneratePort::new()),
        store: Arc::clone(&store) as Arc<dyn questflow_core::ports::StorePort>,
        graph: Arc::clone(&graph) as Arc<dyn questflow_core::ports::GraphPort>,
        config: Arc::new(EngineConfig::default()),
    };

    let result = questflow_workflows::run_article_workflow(&ports, article_input(), vec![], &CancellationToken::new()).await;

    match result {
        WorkflowResult::Created { slug } => assert_eq!(slug, "digital-nomad-visa-greece"),
        other => panic!("expected Created, got {other:?}"),
    }

    assert_eq!(store.call_count(), 1);
    assert_eq!(graph.call_count(), 1);
    let stored = store.get("article", "relocation", "digital-nomad-visa-greece").expect("article was persisted");
    assert_eq!(stored["editorial_status"], serde_json::json!("published"));
}

/// E6: a cancel signal raised while a phase is in flight is observed at the
/// next phase-group boundary, halting the run before persistence or graph
/// sync ever execute.
#[tokio::test]
async fn cancellation_during_synthesis_halts_before_persistence() {
    let store = Arc::new(MockStorePort::new());
    let graph = Arc::new(MockGraphPort::new());

    let cancel = CancellationToken::new();
    let cancel_from_llm = cancel.clone();
    let llm = Arc::new(MockLlmPort::new().with_handler(move |_req| {
        cancel_from_llm.cancel();
        Ok(questflow_core::ports::LlmResponse::Structured(article_response()))
    }));

    let ports = Ports {
        news_search: Arc::new(news_search_mock()),
        deep_research: Arc::new(deep_research_mock()),
        crawler: Arc::new(MockCrawlerPort::new()),
        url_validate: Arc::new(MockUrlValidatePort::new()),
        llm,
        image_generate: Arc::new(MockImageGeneratePort::new()),
        store: Arc::clone(&store) as Arc<dyn questflow_core::ports::StorePort>,
        graph: Arc::clone(&graph) as Arc<dyn questflow_core::ports::GraphPort>,
        config: Arc::new(EngineConfig::default()),
    };

    let result = questflow_workflows::run_article_workflow(&ports, article_input(), vec![], &cancel).await;

    match result {
        WorkflowResult::Cancelled { last_completed_phase } => {
            assert_eq!(last_completed_phase.as_deref(), Some("P5_synthesis"));
        }
        other => panic!("expected Cancelled, got {other:?}"),
    }

    assert_eq!(store.call_count(), 0, "a cancelled run must never persist");
    assert_eq!(graph.call_count(), 0, "a cancelled run must never sync the graph");
}

/// E3 / invariant 7: the same input submitted twice against a shared store
/// commits exactly once; the second run's existence check at `P1_normalize`
/// short-circuits every phase from `P2` onward.
#[tokio::test]
async fn duplicate_submission_commits_at_most_once() {
    let store = Arc::new(MockStorePort::new());
    let graph = Arc::new(MockGraphPort::new());

    let make_ports = || Ports {
        news_search: Arc::new(news_search_mock()),
        deep_research: Arc::new(deep_research_mock()),
        crawler: Arc::new(MockCrawlerPort::new()),
        url_validate: Arc::new(MockUrlValidatePort::new()),
        llm: Arc::new(MockLlmPort::new().with_handler(|_req| {
            Ok(questflow_core::ports::LlmResponse::Structured(article_response()))
        })),
        image_generate: Arc::new(MockImageGeneratePort::new()),
        store: Arc::clone(&store) as Arc<dyn questflow_core::ports::StorePort>,
        graph: Arc::clone(&graph) as Arc<dyn questflow_core::ports::GraphPort>,
        config: Arc::new(EngineConfig::default()),
    };

    let first = questflow_workflows::run_article_workflow(&make_ports(), article_input(), vec![], &CancellationToken::new()).await;
    assert!(matches!(first, WorkflowResult::Created { .. }), "expected Created, got {first:?}");

    let second = questflow_workflows::run_article_workflow(&make_ports(), article_input(), vec![], &CancellationToken::new()).await;
    match second {
        WorkflowResult::Exists { slug } => assert_eq!(slug, "digital-nomad-visa-greece"),
        other => panic!("expected Exists on resubmission, got {other:?}"),
    }

    assert_eq!(store.call_count(), 1, "only the first submission should reach upsert");
    assert_eq!(graph.call_count(), 1, "only the first submission should reach graph sync");
}
