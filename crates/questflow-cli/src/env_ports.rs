//! Wires real vendor adapters from environment variables into a
//! [`questflow_workflows::Ports`] bundle, the same "construct once at
//! process startup" pattern the bundle's own docs describe.

use std::env;
use std::sync::Arc;

use anyhow::{Context, Result};
use questflow_core::EngineConfig;
use questflow_crawler::WebCrawler;
use questflow_graph::Neo4jGraphClient;
use questflow_imagegen::OpenAiImageClient;
use questflow_llm::AnthropicLlmClient;
use questflow_research::ExaResearchClient;
use questflow_search::TavilySearchClient;
use questflow_store::PostgresStore;
use questflow_workflows::Ports;

fn required(name: &str) -> Result<String> {
    env::var(name).with_context(|| format!("environment variable {name} is required"))
}

/// Build the full adapter bundle from the process environment.
///
/// Required: `TAVILY_API_KEY`, `EXA_API_KEY`, `ANTHROPIC_API_KEY`,
/// `OPENAI_API_KEY`, `DATABASE_URL`, `NEO4J_URI`, `NEO4J_USER`,
/// `NEO4J_PASSWORD`. `ANTHROPIC_MODEL` defaults to `claude-sonnet-4-20250514`.
pub async fn build_ports() -> Result<Ports> {
    let news_search = Arc::new(TavilySearchClient::new(required("TAVILY_API_KEY")?));
    let deep_research = Arc::new(ExaResearchClient::new(required("EXA_API_KEY")?));
    let crawler = Arc::new(WebCrawler::new());

    let anthropic_model =
        env::var("ANTHROPIC_MODEL").unwrap_or_else(|_| "claude-sonnet-4-20250514".to_string());
    let llm = Arc::new(AnthropicLlmClient::new(required("ANTHROPIC_API_KEY")?, anthropic_model));

    let image_generate = Arc::new(OpenAiImageClient::new(required("OPENAI_API_KEY")?));

    let store = Arc::new(
        PostgresStore::connect(&required("DATABASE_URL")?)
            .await
            .context("connecting to the QuestFlow store database")?,
    );

    let graph = Arc::new(
        Neo4jGraphClient::connect(&required("NEO4J_URI")?, &required("NEO4J_USER")?, &required("NEO4J_PASSWORD")?)
            .await
            .context("connecting to the knowledge graph")?,
    );

    Ok(Ports {
        news_search,
        deep_research,
        crawler: Arc::clone(&crawler) as Arc<dyn questflow_core::ports::CrawlerPort>,
        url_validate: crawler as Arc<dyn questflow_core::ports::UrlValidatePort>,
        llm,
        image_generate,
        store,
        graph,
        config: Arc::new(EngineConfig::default()),
    })
}
