//! P3: read prior knowledge-graph context for this slug before synthesis
//!. Soft-skip — a workflow with no prior graph episodes is
//! the common case, not a failure.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use questflow_core::ports::GraphPort;
use questflow_core::{CancellationToken, OnFail, Phase, PhaseSpec, WorkflowContext};

use crate::keys;

pub struct GraphContextPhase {
    spec: PhaseSpec,
    graph: Arc<dyn GraphPort>,
}

impl GraphContextPhase {
    #[must_use]
    pub fn new(graph: Arc<dyn GraphPort>) -> Self {
        Self {
            spec: PhaseSpec::new(
                "P3_graph_context",
                vec!["P2_join".into()],
                Duration::from_secs(10),
                OnFail::SoftSkip,
            ),
            graph,
        }
    }
}

#[async_trait]
impl Phase for GraphContextPhase {
    fn spec(&self) -> &PhaseSpec {
        &self.spec
    }

    async fn run(&self, ctx: &mut WorkflowContext, _cancel: &CancellationToken) -> questflow_core::Result<()> {
        if crate::already_exited(ctx) {
            return Ok(());
        }
        if crate::skip_graph_sync(ctx) {
            ctx.insert(keys::GRAPH_CONTEXT, Option::<String>::None)?;
            return Ok(());
        }

        let slug: String = ctx.get(keys::SLUG).unwrap_or_default();
        let app = crate::app_tag_of(ctx);
        let graph_id = format!("{app}:{slug}");
        let context = self.graph.read_context(&graph_id).await?;
        ctx.insert(keys::GRAPH_CONTEXT, context)?;
        Ok(())
    }
}
