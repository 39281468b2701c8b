//! Exa-backed `deep_research` adapter.
//!
//! Implements [`questflow_core::ports::DeepResearchPort`] against the Exa
//! search API, using its neural/auto search mode for broad multi-source
//! coverage. Exa's own result URLs double as seed URLs the engine may feed
//! to a secondary crawl wave within the same P2 fan-out window.

mod error;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use questflow_core::ports::{DeepResearchPort, DeepResearchRequest, DeepResearchResponse, SearchItem};
use questflow_core::Result;

pub use error::Error;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const EXA_SEARCH_URL: &str = "https://api.exa.ai/search";
/// Exa caps results above this breadth; the port's `breadth` is already
/// validated to `3..=20` by `questflow_model::ArticleInput`/`CompanyInput`
/// upstream, but the adapter clamps defensively anyway.
const MAX_NUM_RESULTS: u32 = 20;

fn create_http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(DEFAULT_REQUEST_TIMEOUT)
        .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

#[derive(Clone, Serialize)]
struct ExaRequest {
    query: String,
    #[serde(rename = "type")]
    search_type: &'static str,
    #[serde(rename = "numResults")]
    num_results: u32,
    #[serde(rename = "contents")]
    contents: ExaContents,
}

#[derive(Clone, Serialize)]
struct ExaContents {
    text: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct ExaResult {
    #[serde(default)]
    title: Option<String>,
    url: String,
    #[serde(default, rename = "publishedDate")]
    published_date: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    highlights: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
struct ExaResponse {
    #[serde(default)]
    results: Vec<ExaResult>,
}

/// Exa-backed deep research client.
pub struct ExaResearchClient {
    api_key: String,
    client: reqwest::Client,
    base_url: String,
}

impl ExaResearchClient {
    /// Build a client against the production Exa endpoint.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            client: create_http_client(),
            base_url: EXA_SEARCH_URL.to_string(),
        }
    }

    /// Build a client against a custom base URL, for tests run against a
    /// local mock server.
    #[must_use]
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            client: create_http_client(),
            base_url: base_url.into(),
        }
    }

    async fn do_research(&self, request: &DeepResearchRequest) -> error::Result<ExaResponse> {
        let body = ExaRequest {
            query: request.topic.clone(),
            search_type: "auto",
            num_results: request.breadth.min(MAX_NUM_RESULTS),
            contents: ExaContents { text: true },
        };

        tracing::debug!(topic = %request.topic, breadth = request.breadth, "dispatching exa deep research");

        let response = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(error::Error::Api { status, body });
        }

        response.json().await.map_err(error::Error::Request)
    }
}

#[async_trait]
impl DeepResearchPort for ExaResearchClient {
    async fn research(&self, request: DeepResearchRequest) -> Result<DeepResearchResponse> {
        let response = self.do_research(&request).await.map_err(|e| {
            tracing::warn!(error = %e, "exa deep research failed");
            questflow_core::QuestError::from(e)
        })?;

        let mut seeds = Vec::new();
        let items = response
            .results
            .into_iter()
            .map(|r| {
                seeds.push(r.url.clone());
                let snippet = r
                    .highlights
                    .as_ref()
                    .and_then(|h| h.first())
                    .cloned()
                    .unwrap_or_default();
                SearchItem {
                    url: r.url,
                    title: r.title.unwrap_or_default(),
                    snippet,
                    full_text: r.text,
                    published_at: r.published_date,
                    confidence: 0.6,
                }
            })
            .collect();

        Ok(DeepResearchResponse { items, seeds })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_request() -> DeepResearchRequest {
        DeepResearchRequest { topic: "Acme Corp acquisition history".to_string(), breadth: 10 }
    }

    #[tokio::test]
    async fn research_maps_results_and_collects_seeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("x-api-key", "exa-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [
                    {
                        "title": "Acme history",
                        "url": "https://example.com/acme-history",
                        "publishedDate": "2025-03-01",
                        "text": "Acme was founded in 1990.",
                        "highlights": ["Acme was founded in 1990."]
                    }
                ]
            })))
            .mount(&server)
            .await;

        let client = ExaResearchClient::with_base_url("exa-key", server.uri());
        let response = client.research(sample_request()).await.unwrap();

        assert_eq!(response.items.len(), 1);
        assert_eq!(response.seeds, vec!["https://example.com/acme-history".to_string()]);
        assert_eq!(response.items[0].snippet, "Acme was founded in 1990.");
    }

    #[tokio::test]
    async fn breadth_is_clamped_to_exa_max() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "results": [] })))
            .mount(&server)
            .await;

        let client = ExaResearchClient::with_base_url("exa-key", server.uri());
        let request = DeepResearchRequest { topic: "x".to_string(), breadth: 999 };
        let response = client.research(request).await.unwrap();
        assert!(response.items.is_empty());
    }

    #[tokio::test]
    async fn server_error_maps_to_transient_quest_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let client = ExaResearchClient::with_base_url("exa-key", server.uri());
        let err = client.research(sample_request()).await.unwrap_err();
        assert!(err.is_retriable());
    }
}
