//! Claude Messages API adapter, the synthesizer's generation backend. When
//! a JSON schema is supplied, the request forces a single tool call shaped
//! by that schema so the response is structured output rather than free
//! text requiring a second parse step.

mod error;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use questflow_core::ports::{LlmPort, LlmRequest, LlmResponse};
use questflow_core::Result;

pub use error::Error;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_API_VERSION: &str = "2023-06-01";
const STRUCTURED_OUTPUT_TOOL: &str = "emit_structured_output";

fn create_http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(DEFAULT_REQUEST_TIMEOUT)
        .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

#[derive(Clone, Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: String,
}

#[derive(Clone, Serialize)]
struct AnthropicTool {
    name: String,
    description: String,
    input_schema: Value,
}

#[derive(Clone, Serialize)]
struct ToolChoice {
    #[serde(rename = "type")]
    kind: &'static str,
    name: String,
}

#[derive(Clone, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<AnthropicTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<ToolChoice>,
}

impl std::fmt::Debug for AnthropicRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicRequest")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("messages", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    ToolUse { input: Value },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorEnvelope {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

/// Claude Messages API client implementing `llm_complete`.
pub struct AnthropicLlmClient {
    api_key: String,
    model: String,
    client: reqwest::Client,
    base_url: String,
}

impl AnthropicLlmClient {
    /// Build a client against the production Anthropic endpoint.
    #[must_use]
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            client: create_http_client(),
            base_url: ANTHROPIC_API_URL.to_string(),
        }
    }

    /// Build a client against a custom base URL, for tests run against a
    /// local mock server.
    #[must_use]
    pub fn with_base_url(api_key: impl Into<String>, model: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            client: create_http_client(),
            base_url: base_url.into(),
        }
    }

    async fn dispatch(&self, request: &LlmRequest) -> error::Result<AnthropicResponse> {
        let tools = request.schema.as_ref().map(|schema| {
            vec![AnthropicTool {
                name: STRUCTURED_OUTPUT_TOOL.to_string(),
                description: "Emit the structured result for this request.".to_string(),
                input_schema: schema.clone(),
            }]
        });
        let tool_choice = request
            .schema
            .as_ref()
            .map(|_| ToolChoice { kind: "tool", name: STRUCTURED_OUTPUT_TOOL.to_string() });

        let body = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: request.max_tokens,
            messages: vec![AnthropicMessage { role: "user", content: request.prompt.clone() }],
            tools,
            tool_choice,
        };

        let response = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_API_VERSION)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .json::<AnthropicErrorEnvelope>()
                .await
                .map(|e| e.error.message)
                .unwrap_or_else(|_| "unknown anthropic error".to_string());
            return Err(error::Error::Api { status, message });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl LlmPort for AnthropicLlmClient {
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse> {
        let wants_structured = request.schema.is_some();
        let response = self.dispatch(&request).await.map_err(|e| {
            tracing::warn!(error = %e, "anthropic completion failed");
            questflow_core::QuestError::from(e)
        })?;

        if wants_structured {
            let input = response
                .content
                .into_iter()
                .find_map(|block| match block {
                    ContentBlock::ToolUse { input } => Some(input),
                    _ => None,
                })
                .ok_or(error::Error::MissingContent)
                .map_err(questflow_core::QuestError::from)?;
            Ok(LlmResponse::Structured(input))
        } else {
            let text = response
                .content
                .into_iter()
                .find_map(|block| match block {
                    ContentBlock::Text { text } => Some(text),
                    _ => None,
                })
                .ok_or(error::Error::MissingContent)
                .map_err(questflow_core::QuestError::from)?;
            Ok(LlmResponse::Text(text))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn text_completion_returns_first_text_block() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("x-api-key", "ant-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": [{"type": "text", "text": "Hello from Claude"}]
            })))
            .mount(&server)
            .await;

        let client = AnthropicLlmClient::with_base_url("ant-key", "claude-sonnet-4", server.uri());
        let response = client
            .complete(LlmRequest { prompt: "say hi".to_string(), schema: None, max_tokens: 100 })
            .await
            .unwrap();

        assert!(matches!(response, LlmResponse::Text(t) if t == "Hello from Claude"));
    }

    #[tokio::test]
    async fn structured_completion_forces_tool_use_and_returns_input() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": [{
                    "type": "tool_use",
                    "input": {"title": "A title", "word_count": 1200}
                }]
            })))
            .mount(&server)
            .await;

        let client = AnthropicLlmClient::with_base_url("ant-key", "claude-sonnet-4", server.uri());
        let schema = serde_json::json!({"type": "object", "properties": {"title": {"type": "string"}}});
        let response = client
            .complete(LlmRequest { prompt: "write".to_string(), schema: Some(schema), max_tokens: 2000 })
            .await
            .unwrap();

        match response {
            LlmResponse::Structured(value) => assert_eq!(value["title"], "A title"),
            LlmResponse::Text(_) => panic!("expected structured output"),
        }
    }

    #[tokio::test]
    async fn missing_tool_use_block_is_a_schema_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": [{"type": "text", "text": "I refuse to use the tool"}]
            })))
            .mount(&server)
            .await;

        let client = AnthropicLlmClient::with_base_url("ant-key", "claude-sonnet-4", server.uri());
        let schema = serde_json::json!({"type": "object"});
        let err = client
            .complete(LlmRequest { prompt: "write".to_string(), schema: Some(schema), max_tokens: 2000 })
            .await
            .unwrap_err();
        assert_eq!(err.category(), questflow_core::ErrorCategory::Data);
    }
}
