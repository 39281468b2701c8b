//! P11 (shared, final): write a bounded episode summary to the knowledge
//! graph. Soft-skip — a workflow that persisted its record
//! but failed to sync the graph has still done the thing the caller asked
//! for; the graph catches up on the next run via P3's context read. A
//! below-floor draft also skips this phase entirely: a record that never
//! cleared completeness has nothing worth feeding back into the graph yet.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use questflow_core::ports::{GraphPort, GraphUpsertRequest};
use questflow_core::{CancellationToken, OnFail, Phase, PhaseSpec, WorkflowContext};
use questflow_model::{ArticlePayload, ProfilePayload, WorkflowResult};

use crate::keys;

/// Episode text is capped at this many characters, matching the
/// `graph_upsert` port's documented bound.
const MAX_EPISODE_CHARS: usize = 10_000;

fn truncate(text: &str) -> String {
    if text.len() <= MAX_EPISODE_CHARS {
        return text.to_string();
    }
    let mut end = MAX_EPISODE_CHARS;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

pub struct GraphSyncPhase {
    spec: PhaseSpec,
    graph: Arc<dyn GraphPort>,
}

impl GraphSyncPhase {
    #[must_use]
    pub fn article(graph: Arc<dyn GraphPort>) -> Self {
        Self {
            spec: PhaseSpec::new(
                "P11_graph_sync",
                vec!["P10_persistence".into()],
                Duration::from_secs(30),
                OnFail::SoftSkip,
            ),
            graph,
        }
    }

    #[must_use]
    pub fn company(graph: Arc<dyn GraphPort>) -> Self {
        Self {
            spec: PhaseSpec::new(
                "P11_graph_sync",
                vec!["P_backfill".into()],
                Duration::from_secs(30),
                OnFail::SoftSkip,
            ),
            graph,
        }
    }
}

#[async_trait]
impl Phase for GraphSyncPhase {
    fn spec(&self) -> &PhaseSpec {
        &self.spec
    }

    async fn run(&self, ctx: &mut WorkflowContext, _cancel: &CancellationToken) -> questflow_core::Result<()> {
        if crate::already_exited(ctx) {
            return Ok(());
        }
        if crate::skip_graph_sync(ctx) {
            return Ok(());
        }
        if matches!(ctx.get::<WorkflowResult>(keys::STORE_RESULT), Some(WorkflowResult::Draft { .. })) {
            return Ok(());
        }

        let slug: String = ctx.get(keys::SLUG).unwrap_or_default();
        let app = crate::app_tag_of(ctx);
        let graph_id = format!("{app}:{slug}");

        let (episode_text, links) = if let Some(payload) = ctx.get::<ArticlePayload>(keys::PAYLOAD) {
            let links = payload.mentioned_company_ids().into_iter().map(|id| id.to_string()).collect();
            (format!("{}\n\n{}", payload.title, payload.excerpt), links)
        } else if let Some(payload) = ctx.get::<ProfilePayload>(keys::PAYLOAD) {
            (format!("{} ({})", payload.legal_name, payload.company_type), Vec::new())
        } else {
            return Ok(());
        };

        let response = self
            .graph
            .upsert_episode(GraphUpsertRequest { graph_id, episode_text: truncate(&episode_text), links })
            .await?;
        ctx.insert(keys::GRAPH_SYNC, response.facts_count)?;
        Ok(())
    }
}
