//! Vendor error type for the OpenAI image generation adapter.

use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("image generation request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("OpenAI image API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("content policy violation: {0}")]
    ContentPolicy(String),

    #[error("response did not include an image")]
    MissingImage,
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for questflow_core::QuestError {
    fn from(err: Error) -> Self {
        match err {
            Error::Request(e) if e.is_timeout() => questflow_core::QuestError::TimedOut {
                activity: "image_generate".to_string(),
                elapsed_ms: 0,
            },
            Error::Request(e) => questflow_core::QuestError::FetchFailed {
                url: "https://api.openai.com/v1/images/generations".to_string(),
                detail: e.to_string(),
            },
            Error::Api { status, message } if status == 429 => questflow_core::QuestError::RateLimited {
                adapter: "openai-images".to_string(),
                retry_after_ms: None,
            },
            Error::Api { status, message } if status >= 500 => questflow_core::QuestError::Upstream5xx {
                adapter: "openai-images".to_string(),
                detail: message,
            },
            Error::Api { status, message } => questflow_core::QuestError::FetchFailed {
                url: "https://api.openai.com/v1/images/generations".to_string(),
                detail: format!("status {status}: {message}"),
            },
            Error::ContentPolicy(detail) => questflow_core::QuestError::ContentPolicy(detail),
            Error::MissingImage => {
                questflow_core::QuestError::SchemaInvalid("no image in response".to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_policy_maps_to_data_category() {
        let quest: questflow_core::QuestError = Error::ContentPolicy("blocked term".into()).into();
        assert_eq!(quest.category(), questflow_core::ErrorCategory::Data);
    }
}
