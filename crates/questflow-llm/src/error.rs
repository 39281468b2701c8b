//! Vendor error type for the Claude Messages API adapter.

use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("anthropic request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("anthropic API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("response did not contain the expected content block")]
    MissingContent,

    #[error("structured output failed schema validation: {0}")]
    SchemaInvalid(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for questflow_core::QuestError {
    fn from(err: Error) -> Self {
        match err {
            Error::Request(e) if e.is_timeout() => questflow_core::QuestError::TimedOut {
                activity: "llm_complete".to_string(),
                elapsed_ms: 0,
            },
            Error::Request(e) => questflow_core::QuestError::FetchFailed {
                url: "https://api.anthropic.com/v1/messages".to_string(),
                detail: e.to_string(),
            },
            Error::Api { status, message } if status == 429 => questflow_core::QuestError::RateLimited {
                adapter: "anthropic".to_string(),
                retry_after_ms: None,
            },
            Error::Api { status, message } if status >= 500 => questflow_core::QuestError::Upstream5xx {
                adapter: "anthropic".to_string(),
                detail: message,
            },
            Error::Api { status, message } => questflow_core::QuestError::FetchFailed {
                url: "https://api.anthropic.com/v1/messages".to_string(),
                detail: format!("status {status}: {message}"),
            },
            Error::MissingContent => {
                questflow_core::QuestError::SchemaInvalid("missing content block".to_string())
            }
            Error::SchemaInvalid(detail) => questflow_core::QuestError::SchemaInvalid(detail),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_invalid_maps_to_data_category() {
        let quest: questflow_core::QuestError = Error::SchemaInvalid("missing field".into()).into();
        assert_eq!(quest.category(), questflow_core::ErrorCategory::Data);
    }

    #[test]
    fn rate_limit_status_is_transient() {
        let quest: questflow_core::QuestError =
            Error::Api { status: 429, message: "slow down".into() }.into();
        assert_eq!(quest.category(), questflow_core::ErrorCategory::Transient);
    }
}
