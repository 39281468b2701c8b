//! Vendor error type for the Neo4j-backed graph adapter.
//!
//! Every variant converts into [`questflow_core::QuestError::DependencySoftFail`]
//! — graph sync is a soft dependency: a failure here is recorded
//! as an event and never blocks the workflow from completing.

use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("Neo4j connection error: {0}")]
    Connection(#[from] neo4rs::Error),

    #[error("Neo4j query returned an unexpected shape: {0}")]
    UnexpectedShape(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for questflow_core::QuestError {
    fn from(err: Error) -> Self {
        questflow_core::QuestError::DependencySoftFail {
            dependency: "graph_sync".to_string(),
            detail: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unexpected_shape_maps_to_dependency_soft_fail() {
        let quest: questflow_core::QuestError = Error::UnexpectedShape("missing column".into()).into();
        assert!(quest.is_soft_skip());
        assert_eq!(quest.category(), questflow_core::ErrorCategory::Dependency);
    }
}
