//! Neo4j-backed `graph_upsert` adapter.
//!
//! Writes each published record as an `Episode` node linked to the entities
//! it mentions, and lets the synthesizer read back prior episode context
//! for the same slug before drafting a follow-up piece (P3).

mod error;

use std::sync::Arc;

use async_trait::async_trait;
use neo4rs::{Graph, Query};

use questflow_core::ports::{GraphPort, GraphUpsertRequest, GraphUpsertResponse};
use questflow_core::Result;

pub use error::Error;

/// Episode text longer than this is truncated before being written, per the
/// port contract's bounded-episode-summary constraint.
const MAX_EPISODE_CHARS: usize = 10_000;

/// Neo4j-backed graph store connection.
pub struct Neo4jGraphClient {
    graph: Arc<Graph>,
}

impl Neo4jGraphClient {
    /// Connect to a Neo4j instance at `uri` with the given credentials.
    pub async fn connect(uri: &str, user: &str, password: &str) -> error::Result<Self> {
        let graph = Graph::new(uri, user, password).await?;
        Ok(Self { graph: Arc::new(graph) })
    }

    /// Wrap an already-connected graph handle, for tests and callers that
    /// manage their own connection pool.
    #[must_use]
    pub fn from_graph(graph: Arc<Graph>) -> Self {
        Self { graph }
    }
}

#[async_trait]
impl GraphPort for Neo4jGraphClient {
    async fn upsert_episode(&self, request: GraphUpsertRequest) -> Result<GraphUpsertResponse> {
        let episode_text: String = request.episode_text.chars().take(MAX_EPISODE_CHARS).collect();

        let query = Query::new(
            "MERGE (e:Episode {graph_id: $graph_id}) \
             SET e.text = $text, e.updated_at = timestamp() \
             WITH e \
             UNWIND $links AS link \
             MERGE (n:Entity {name: link}) \
             MERGE (e)-[:MENTIONS]->(n) \
             RETURN count(n) AS facts_count"
                .to_string(),
        )
        .param("graph_id", request.graph_id.clone())
        .param("text", episode_text)
        .param("links", request.links.clone());

        tracing::debug!(graph_id = %request.graph_id, links = request.links.len(), "upserting graph episode");

        let mut stream = self.graph.execute(query).await.map_err(error::Error::Connection).map_err(questflow_core::QuestError::from)?;

        let facts_count = match stream.next().await.map_err(error::Error::Connection).map_err(questflow_core::QuestError::from)? {
            Some(row) => row.get::<i64>("facts_count").unwrap_or(0).max(0) as u32,
            None => 0,
        };

        Ok(GraphUpsertResponse { graph_id: request.graph_id, facts_count })
    }

    async fn read_context(&self, graph_id: &str) -> Result<Option<String>> {
        let query = Query::new(
            "MATCH (e:Episode {graph_id: $graph_id}) RETURN e.text AS text ORDER BY e.updated_at DESC LIMIT 1"
                .to_string(),
        )
        .param("graph_id", graph_id.to_string());

        let mut stream = self.graph.execute(query).await.map_err(error::Error::Connection).map_err(questflow_core::QuestError::from)?;

        match stream.next().await.map_err(error::Error::Connection).map_err(questflow_core::QuestError::from)? {
            Some(row) => Ok(row.get::<String>("text").ok()),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn episode_text_over_limit_is_truncated_before_write() {
        let long_text: String = "x".repeat(MAX_EPISODE_CHARS + 500);
        let truncated: String = long_text.chars().take(MAX_EPISODE_CHARS).collect();
        assert_eq!(truncated.chars().count(), MAX_EPISODE_CHARS);
    }

    #[test]
    fn connection_errors_always_soft_skip() {
        let err = error::Error::UnexpectedShape("no rows".to_string());
        let quest: questflow_core::QuestError = err.into();
        assert!(quest.is_soft_skip());
    }
}
