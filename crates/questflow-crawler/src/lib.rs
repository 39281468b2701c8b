//! SSRF-safe crawler and URL-validation adapters: fetch, strip
//! scripts/styles, extract main content text and image URLs.

mod error;
mod ssrf;

use std::time::Duration;

use async_trait::async_trait;
use ego_tree::iter::Edge;
use scraper::{Html, Selector};
use url::Url;

use questflow_core::ports::{CrawlRequest, CrawlResponse, CrawlerPort, UrlValidatePort, UrlValidation};
use questflow_core::Result;

pub use error::Error;
pub use ssrf::SsrfConfig;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

fn create_http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(DEFAULT_REQUEST_TIMEOUT)
        .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// SSRF-safe HTML crawler. Also implements URL validation by issuing a
/// lightweight request and reporting the observed status.
pub struct WebCrawler {
    client: reqwest::Client,
    ssrf: SsrfConfig,
}

impl Default for WebCrawler {
    fn default() -> Self {
        Self::new()
    }
}

impl WebCrawler {
    /// Build a crawler with default SSRF protection (private/loopback/
    /// metadata ranges and non-standard ports blocked).
    #[must_use]
    pub fn new() -> Self {
        Self { client: create_http_client(), ssrf: SsrfConfig::default() }
    }

    /// Build a crawler with custom SSRF protection, e.g. for tests that
    /// need to fetch from a loopback mock server.
    #[must_use]
    pub fn with_ssrf_config(ssrf: SsrfConfig) -> Self {
        Self { client: create_http_client(), ssrf }
    }

    async fn fetch(&self, url_str: &str) -> error::Result<(String, Url)> {
        let url = Url::parse(url_str).map_err(|e| error::Error::InvalidUrl(url_str.to_string(), e.to_string()))?;
        self.ssrf
            .validate_url(&url)
            .map_err(|reason| error::Error::SsrfRejected { url: url_str.to_string(), reason })?;

        let response = self.client.get(url.as_str()).send().await?;
        let final_url = response.url().clone();
        if !response.status().is_success() {
            return Err(error::Error::HttpStatus { url: url_str.to_string(), status: response.status().as_u16() });
        }
        let body = response.text().await?;
        Ok((body, final_url))
    }

    fn extract_title(document: &Html) -> String {
        let Ok(selector) = Selector::parse("title") else { return String::new() };
        document
            .select(&selector)
            .next()
            .map(|el| el.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" "))
            .unwrap_or_default()
    }

    fn extract_visible_text(element: &scraper::ElementRef<'_>) -> String {
        let mut chunks: Vec<&str> = Vec::new();
        let mut skip_depth = 0usize;
        for edge in element.traverse() {
            match edge {
                Edge::Open(node) => match node.value() {
                    scraper::Node::Element(el) if matches!(el.name(), "script" | "style" | "noscript") => {
                        skip_depth += 1;
                    }
                    scraper::Node::Text(text) if skip_depth == 0 => chunks.push(text),
                    _ => {}
                },
                Edge::Close(node) => {
                    if let scraper::Node::Element(el) = node.value() {
                        if matches!(el.name(), "script" | "style" | "noscript") && skip_depth > 0 {
                            skip_depth -= 1;
                        }
                    }
                }
            }
        }
        chunks.join(" ")
    }

    fn extract_text(document: &Html) -> String {
        for selector_str in ["article", "main", ".content", "#content", "body"] {
            let Ok(selector) = Selector::parse(selector_str) else { continue };
            for element in document.select(&selector) {
                let text = Self::extract_visible_text(&element);
                if !text.trim().is_empty() {
                    return Self::clean_text(&text);
                }
            }
        }
        String::new()
    }

    fn clean_text(text: &str) -> String {
        text.lines().map(str::trim).filter(|l| !l.is_empty()).collect::<Vec<_>>().join("\n")
    }

    fn extract_images(document: &Html, base: &Url) -> Vec<String> {
        let Ok(selector) = Selector::parse("img[src]") else { return Vec::new() };
        document
            .select(&selector)
            .filter_map(|el| el.value().attr("src"))
            .filter_map(|src| base.join(src).ok())
            .map(|u| u.to_string())
            .collect()
    }
}

#[async_trait]
impl CrawlerPort for WebCrawler {
    async fn crawl(&self, request: CrawlRequest) -> Result<CrawlResponse> {
        tracing::debug!(url = %request.url, depth = request.depth, "crawling url");
        let (html, final_url) = self.fetch(&request.url).await.map_err(|e| {
            tracing::warn!(url = %request.url, error = %e, "crawl failed");
            questflow_core::QuestError::from(e)
        })?;

        let document = Html::parse_document(&html);
        let title = Self::extract_title(&document);
        let text = Self::extract_text(&document);
        let images = Self::extract_images(&document, &final_url);

        Ok(CrawlResponse { url: final_url.to_string(), title, text, images })
    }
}

#[async_trait]
impl UrlValidatePort for WebCrawler {
    async fn validate(&self, urls: Vec<String>) -> Result<Vec<UrlValidation>> {
        let mut results = Vec::with_capacity(urls.len());
        for url in urls {
            let validation = match self.fetch(&url).await {
                Ok((_, final_url)) => UrlValidation {
                    final_url: (final_url.as_str() != url).then(|| final_url.to_string()),
                    url,
                    status: 200,
                },
                Err(error::Error::HttpStatus { status, .. }) => UrlValidation { url, status, final_url: None },
                Err(_) => UrlValidation { url, status: 0, final_url: None },
            };
            results.push(validation);
        }
        Ok(results)
    }
}
