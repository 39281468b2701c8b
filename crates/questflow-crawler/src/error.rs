//! Vendor error type for the crawler and URL-validation adapters.

use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("invalid URL '{0}': {1}")]
    InvalidUrl(String, String),

    #[error("SSRF protection rejected '{url}': {reason}")]
    SsrfRejected { url: String, reason: String },

    #[error("crawl request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP error {status} fetching {url}")]
    HttpStatus { url: String, status: u16 },
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for questflow_core::QuestError {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidUrl(url, detail) => {
                questflow_core::QuestError::FetchFailed { url, detail }
            }
            Error::SsrfRejected { url, reason } => {
                questflow_core::QuestError::FetchFailed { url, detail: reason }
            }
            Error::Request(e) if e.is_timeout() => questflow_core::QuestError::TimedOut {
                activity: "crawler".to_string(),
                elapsed_ms: 0,
            },
            Error::Request(e) => questflow_core::QuestError::FetchFailed {
                url: e.url().map(ToString::to_string).unwrap_or_default(),
                detail: e.to_string(),
            },
            Error::HttpStatus { url, status } if status == 402 || status == 403 => {
                questflow_core::QuestError::Paywall(url)
            }
            Error::HttpStatus { url, status } if status == 404 => {
                questflow_core::QuestError::NotFound(url)
            }
            Error::HttpStatus { url, status } if status >= 500 => {
                questflow_core::QuestError::Upstream5xx {
                    adapter: "crawler".to_string(),
                    detail: format!("{url}: status {status}"),
                }
            }
            Error::HttpStatus { url, status } => questflow_core::QuestError::FetchFailed {
                url,
                detail: format!("status {status}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paywall_status_maps_to_paywall_error() {
        let quest: questflow_core::QuestError =
            Error::HttpStatus { url: "https://example.com/a".into(), status: 403 }.into();
        assert!(matches!(quest, questflow_core::QuestError::Paywall(_)));
    }

    #[test]
    fn server_error_is_transient() {
        let quest: questflow_core::QuestError =
            Error::HttpStatus { url: "https://example.com/a".into(), status: 503 }.into();
        assert_eq!(quest.category(), questflow_core::ErrorCategory::Transient);
    }
}
