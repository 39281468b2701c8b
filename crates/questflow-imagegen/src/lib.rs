//! OpenAI image generation adapter.
//!
//! No teacher crate wraps an image generation API directly, so this client
//! is authored fresh in the same shape as the other adapters: a
//! `create_http_client()`-built `reqwest::Client`, a redacted request
//! struct, and a vendor `Error` enum converting into `QuestError` at the
//! crate boundary.

mod error;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use questflow_core::ports::{ImageAspect, ImageGenerateRequest, ImageGenerateResponse, ImageGeneratePort};
use questflow_core::Result;

pub use error::Error;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(90);
const OPENAI_IMAGES_URL: &str = "https://api.openai.com/v1/images/generations";

fn create_http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(DEFAULT_REQUEST_TIMEOUT)
        .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

fn size_for_aspect(aspect: ImageAspect) -> (&'static str, u32, u32) {
    match aspect {
        ImageAspect::Featured => ("1536x1024", 1536, 1024),
        ImageAspect::Hero => ("1792x1024", 1792, 1024),
        ImageAspect::Content => ("1024x1024", 1024, 1024),
    }
}

/// Deterministic fingerprint for one image generation request, used by the
/// persistence coordinator to dedupe regeneration across retries: a
/// blake3 hash of the seed, prompt, and optional reference image URL.
#[must_use]
pub fn fingerprint(seed: u64, prompt: &str, reference_url: Option<&str>) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&seed.to_le_bytes());
    hasher.update(b"\0");
    hasher.update(prompt.as_bytes());
    hasher.update(b"\0");
    hasher.update(reference_url.unwrap_or_default().as_bytes());
    hex::encode(hasher.finalize().as_bytes())
}

#[derive(Clone, Serialize)]
struct OpenAiImageRequest {
    model: &'static str,
    prompt: String,
    size: &'static str,
    n: u32,
}

impl std::fmt::Debug for OpenAiImageRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiImageRequest")
            .field("model", &self.model)
            .field("prompt", &self.prompt)
            .field("size", &self.size)
            .field("n", &self.n)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAiImageData {
    url: Option<String>,
    #[serde(default)]
    revised_prompt: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAiImageResponse {
    #[serde(default)]
    data: Vec<OpenAiImageData>,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorEnvelope {
    error: OpenAiErrorBody,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorBody {
    message: String,
    #[serde(default)]
    code: Option<String>,
}

/// OpenAI-backed image generation client.
pub struct OpenAiImageClient {
    api_key: String,
    model: &'static str,
    client: reqwest::Client,
    base_url: String,
}

impl OpenAiImageClient {
    /// Build a client against the production OpenAI endpoint.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: "gpt-image-1",
            client: create_http_client(),
            base_url: OPENAI_IMAGES_URL.to_string(),
        }
    }

    /// Build a client against a custom base URL, for tests run against a
    /// local mock server.
    #[must_use]
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: "gpt-image-1",
            client: create_http_client(),
            base_url: base_url.into(),
        }
    }

    async fn dispatch(&self, prompt: &str, size: &'static str) -> error::Result<OpenAiImageResponse> {
        let body = OpenAiImageRequest { model: self.model, prompt: prompt.to_string(), size, n: 1 };

        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let envelope: Option<OpenAiErrorEnvelope> = response.json().await.ok();
            let (message, code) = envelope
                .map(|e| (e.error.message, e.error.code))
                .unwrap_or_else(|| ("unknown openai error".to_string(), None));
            if code.as_deref() == Some("content_policy_violation") {
                return Err(error::Error::ContentPolicy(message));
            }
            return Err(error::Error::Api { status, message });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl ImageGeneratePort for OpenAiImageClient {
    async fn generate(&self, request: ImageGenerateRequest) -> Result<ImageGenerateResponse> {
        let (size_str, width, height) = size_for_aspect(request.aspect);

        let prompt = match &request.reference_url {
            Some(reference) => format!("{}\n\nStyle-match reference image: {reference}", request.prompt),
            None => request.prompt.clone(),
        };

        tracing::debug!(aspect = ?request.aspect, "dispatching image generation");
        let response = self.dispatch(&prompt, size_str).await.map_err(|e| {
            tracing::warn!(error = %e, "image generation failed");
            questflow_core::QuestError::from(e)
        })?;

        let url = response
            .data
            .into_iter()
            .find_map(|d| d.url)
            .ok_or(error::Error::MissingImage)
            .map_err(questflow_core::QuestError::from)?;

        let seed = u64::from_le_bytes(
            blake3::hash(url.as_bytes()).as_bytes()[..8]
                .try_into()
                .unwrap_or([0; 8]),
        );

        Ok(ImageGenerateResponse { url, width, height, seed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn fingerprint_is_deterministic_for_same_inputs() {
        let a = fingerprint(42, "a hero image", Some("https://example.com/ref.png"));
        let b = fingerprint(42, "a hero image", Some("https://example.com/ref.png"));
        assert_eq!(a, b);
    }

    #[test]
    fn fingerprint_differs_when_prompt_changes() {
        let a = fingerprint(42, "a hero image", None);
        let b = fingerprint(42, "a different hero image", None);
        assert_ne!(a, b);
    }

    #[test]
    fn fingerprint_differs_with_and_without_reference() {
        let a = fingerprint(1, "prompt", None);
        let b = fingerprint(1, "prompt", Some("https://example.com/ref.png"));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn generate_returns_url_and_aspect_dimensions() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"url": "https://cdn.example.com/img1.png"}]
            })))
            .mount(&server)
            .await;

        let client = OpenAiImageClient::with_base_url("sk-key", server.uri());
        let response = client
            .generate(ImageGenerateRequest {
                prompt: "a featured image for an article about visas".to_string(),
                reference_url: None,
                aspect: ImageAspect::Featured,
            })
            .await
            .unwrap();

        assert_eq!(response.url, "https://cdn.example.com/img1.png");
        assert_eq!((response.width, response.height), (1536, 1024));
    }

    #[tokio::test]
    async fn content_policy_violation_is_mapped_to_data_category() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {"message": "blocked", "code": "content_policy_violation"}
            })))
            .mount(&server)
            .await;

        let client = OpenAiImageClient::with_base_url("sk-key", server.uri());
        let err = client
            .generate(ImageGenerateRequest {
                prompt: "disallowed".to_string(),
                reference_url: None,
                aspect: ImageAspect::Content,
            })
            .await
            .unwrap_err();
        assert_eq!(err.category(), questflow_core::ErrorCategory::Data);
    }
}
