//! Vendor error type for the Exa-backed deep research adapter.

use thiserror::Error;

/// Errors that can occur while calling the Exa search API.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The HTTP request itself failed (connect, timeout, TLS, ...).
    #[error("Exa request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Exa responded with a non-success status.
    #[error("Exa API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, if any was readable.
        body: String,
    },

    /// The response body didn't decode into the expected shape.
    #[error("Exa response decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for questflow_core::QuestError {
    fn from(err: Error) -> Self {
        match err {
            Error::Request(e) if e.is_timeout() => questflow_core::QuestError::TimedOut {
                activity: "deep_research".to_string(),
                elapsed_ms: 0,
            },
            Error::Request(e) => questflow_core::QuestError::FetchFailed {
                url: "https://api.exa.ai/search".to_string(),
                detail: e.to_string(),
            },
            Error::Api { status, body } if status == 429 => questflow_core::QuestError::RateLimited {
                adapter: "exa".to_string(),
                retry_after_ms: None,
            },
            Error::Api { status, body } if status >= 500 => questflow_core::QuestError::Upstream5xx {
                adapter: "exa".to_string(),
                detail: format!("status {status}: {body}"),
            },
            Error::Api { status, body } => questflow_core::QuestError::FetchFailed {
                url: "https://api.exa.ai/search".to_string(),
                detail: format!("status {status}: {body}"),
            },
            Error::Decode(e) => questflow_core::QuestError::SchemaInvalid(e.to_string()),
        }
    }
}
