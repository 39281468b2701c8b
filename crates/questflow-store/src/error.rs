//! Vendor error type for the PostgreSQL-backed store adapter.

use thiserror::Error;

/// Postgres SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("record not found: kind={kind} app={app} slug={slug}")]
    NotFound { kind: String, app: String, slug: String },
}

pub type Result<T> = std::result::Result<T, Error>;

/// True if the underlying Postgres error is a `unique_violation` on the
/// `(app, kind, slug)` constraint — the race a concurrent writer can win.
fn is_unique_violation(err: &tokio_postgres::Error) -> bool {
    err.code().map(|c| c.code() == UNIQUE_VIOLATION).unwrap_or(false)
}

impl Error {
    /// Wrap a raw Postgres error, recognizing a slug-uniqueness race so the
    /// caller can report `StoreUpsertOutcome::Conflict` instead of a bare
    /// error.
    pub(crate) fn from_postgres_upsert(err: tokio_postgres::Error) -> SlugAwareError {
        if is_unique_violation(&err) {
            SlugAwareError::Conflict
        } else {
            SlugAwareError::Other(Error::Postgres(err))
        }
    }
}

/// Distinguishes a slug race (handled as a business-level outcome, not an
/// error) from every other failure during an upsert.
pub(crate) enum SlugAwareError {
    Conflict,
    Other(Error),
}

impl From<Error> for questflow_core::QuestError {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidIdentifier(detail) => questflow_core::QuestError::InputInvalid(detail),
            Error::Postgres(e) if is_unique_violation(&e) => {
                questflow_core::QuestError::Constraint(e.to_string())
            }
            Error::Postgres(e) => questflow_core::QuestError::Constraint(e.to_string()),
            Error::Json(e) => questflow_core::QuestError::SchemaInvalid(e.to_string()),
            Error::NotFound { kind, app, slug } => {
                questflow_core::QuestError::NotFound(format!("{kind}/{app}/{slug}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_identifier_maps_to_input_invalid() {
        let quest: questflow_core::QuestError =
            Error::InvalidIdentifier("bad name".into()).into();
        assert_eq!(quest.category(), questflow_core::ErrorCategory::Input);
    }

    #[test]
    fn not_found_maps_to_data_category() {
        let quest: questflow_core::QuestError = Error::NotFound {
            kind: "article".into(),
            app: "relocation".into(),
            slug: "visas".into(),
        }
        .into();
        assert_eq!(quest.category(), questflow_core::ErrorCategory::Data);
    }
}
