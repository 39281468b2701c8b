//! Vendor error type for the Tavily-backed news search adapter.

use thiserror::Error;

/// Errors that can occur while calling the Tavily search API.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The HTTP request itself failed (connect, timeout, TLS, ...).
    #[error("Tavily request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Tavily responded with a non-success status.
    #[error("Tavily API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, if any was readable.
        body: String,
    },

    /// The response body didn't decode into the expected shape.
    #[error("Tavily response decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Result type for this crate's internal operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for questflow_core::QuestError {
    fn from(err: Error) -> Self {
        match err {
            Error::Request(e) if e.is_timeout() => questflow_core::QuestError::TimedOut {
                activity: "news_search".to_string(),
                elapsed_ms: 0,
            },
            Error::Request(e) => questflow_core::QuestError::FetchFailed {
                url: "https://api.tavily.com/search".to_string(),
                detail: e.to_string(),
            },
            Error::Api { status, body } if status == 429 => questflow_core::QuestError::RateLimited {
                adapter: "tavily".to_string(),
                retry_after_ms: None,
            },
            Error::Api { status, body } if status >= 500 => questflow_core::QuestError::Upstream5xx {
                adapter: "tavily".to_string(),
                detail: format!("status {status}: {body}"),
            },
            Error::Api { status, body } => questflow_core::QuestError::FetchFailed {
                url: "https://api.tavily.com/search".to_string(),
                detail: format!("status {status}: {body}"),
            },
            Error::Decode(e) => questflow_core::QuestError::SchemaInvalid(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_display_includes_status_and_body() {
        let err = Error::Api { status: 503, body: "down".to_string() };
        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("down"));
    }

    #[test]
    fn rate_limited_maps_to_transient_category() {
        let err = Error::Api { status: 429, body: String::new() };
        let quest: questflow_core::QuestError = err.into();
        assert_eq!(quest.category(), questflow_core::ErrorCategory::Transient);
    }

    #[test]
    fn upstream_5xx_maps_to_transient_category() {
        let err = Error::Api { status: 502, body: String::new() };
        let quest: questflow_core::QuestError = err.into();
        assert_eq!(quest.category(), questflow_core::ErrorCategory::Transient);
    }
}
