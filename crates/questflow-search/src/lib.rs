//! Tavily-backed `news_search` adapter.
//!
//! Implements [`questflow_core::ports::NewsSearchPort`] against the Tavily
//! search API, wired directly into the workflow engine as a port rather
//! than exposed as an LLM-callable tool.

mod error;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use questflow_core::ports::{NewsSearchPort, NewsSearchRequest, NewsSearchResponse, SearchItem};
use questflow_core::Result;

pub use error::Error;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
const TAVILY_SEARCH_URL: &str = "https://api.tavily.com/search";

fn create_http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(DEFAULT_REQUEST_TIMEOUT)
        .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

#[derive(Clone, Serialize)]
struct TavilyRequest {
    api_key: String,
    query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_results: Option<u32>,
    include_raw_content: bool,
}

impl std::fmt::Debug for TavilyRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TavilyRequest")
            .field("api_key", &"[REDACTED]")
            .field("query", &self.query)
            .field("topic", &self.topic)
            .field("days", &self.days)
            .field("max_results", &self.max_results)
            .field("include_raw_content", &self.include_raw_content)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
struct TavilyResult {
    title: String,
    url: String,
    content: String,
    #[serde(default)]
    raw_content: Option<String>,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    published_date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

/// Maps a `NewsSearchRequest::time_window` like `"7d"` or `"30d"` onto
/// Tavily's `days` parameter; anything that doesn't parse searches
/// unrestricted rather than failing the request.
fn time_window_to_days(time_window: &str) -> Option<u32> {
    time_window.strip_suffix('d').and_then(|n| n.parse().ok())
}

/// Tavily-backed news search client.
pub struct TavilySearchClient {
    api_key: String,
    client: reqwest::Client,
    base_url: String,
}

impl TavilySearchClient {
    /// Build a client against the production Tavily endpoint.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            client: create_http_client(),
            base_url: TAVILY_SEARCH_URL.to_string(),
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

    async fn do_search(&self, request: &NewsSearchRequest) -> error::Result<TavilyResponse> {
        let body = TavilyRequest {
            api_key: self.api_key.clone(),
            query: request.query.clone(),
            topic: Some("news".to_string()),
            days: time_window_to_days(&request.time_window),
            max_results: Some(request.limit),
            include_raw_content: true,
        };

        tracing::debug!(query = %request.query, "dispatching tavily news search");

        let response = self.client.post(&self.base_url).json(&body).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(error::Error::Api { status, body });
        }

        let parsed: TavilyResponse = response.json().await.map_err(error::Error::Request)?;
        Ok(parsed)
    }
}

#[async_trait]
impl NewsSearchPort for TavilySearchClient {
    async fn search(&self, request: NewsSearchRequest) -> Result<NewsSearchResponse> {
        let response = self.do_search(&request).await.map_err(|e| {
            tracing::warn!(error = %e, "tavily news search failed");
            questflow_core::QuestError::from(e)
        })?;

        let items = response
            .results
            .into_iter()
            .map(|r| SearchItem {
                url: r.url,
                title: r.title,
                snippet: r.content,
                full_text: r.raw_content,
                published_at: r.published_date,
                confidence: r.score.unwrap_or(0.5).clamp(0.0, 1.0),
            })
            .collect();

        Ok(NewsSearchResponse { items })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_request() -> NewsSearchRequest {
        NewsSearchRequest {
            query: "acme corp acquisition".to_string(),
            geo: None,
            time_window: "7d".to_string(),
            limit: 5,
        }
    }

    #[test]
    fn time_window_maps_day_suffix() {
        assert_eq!(time_window_to_days("1d"), Some(1));
        assert_eq!(time_window_to_days("7d"), Some(7));
        assert_eq!(time_window_to_days("30d"), Some(30));
        assert_eq!(time_window_to_days("anything_else"), None);
    }

    #[test]
    fn debug_impl_redacts_api_key() {
        let req = TavilyRequest {
            api_key: "tvly-secret".to_string(),
            query: "q".to_string(),
            topic: None,
            days: None,
            max_results: None,
            include_raw_content: false,
        };
        let debug = format!("{req:?}");
        assert!(!debug.contains("tvly-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[tokio::test]
    async fn search_maps_results_into_search_items() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [
                    {
                        "title": "Acme acquired by Globex",
                        "url": "https://news.example.com/acme",
                        "content": "Acme Corp was acquired today.",
                        "raw_content": null,
                        "score": 0.91,
                        "published_date": "2026-01-10"
                    }
                ]
            })))
            .mount(&server)
            .await;

        let client = TavilySearchClient::with_base_url("tvly-key", server.uri());
        let response = client.search(sample_request()).await.unwrap();

        assert_eq!(response.items.len(), 1);
        assert_eq!(response.items[0].title, "Acme acquired by Globex");
        assert!((response.items[0].confidence - 0.91).abs() < 1e-9);
    }

    #[tokio::test]
    async fn non_success_status_surfaces_as_quest_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let client = TavilySearchClient::with_base_url("tvly-key", server.uri());
        let err = client.search(sample_request()).await.unwrap_err();
        assert_eq!(err.category(), questflow_core::ErrorCategory::Transient);
    }

    #[tokio::test]
    async fn rate_limit_status_is_retriable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let client = TavilySearchClient::with_base_url("tvly-key", server.uri());
        let err = client.search(sample_request()).await.unwrap_err();
        assert!(err.is_retriable());
    }
}
