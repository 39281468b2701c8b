//! P5: narrative-first synthesis. Thin phase wrapper around
//! [`crate::synthesis`]'s shared article/company generation logic, which is
//! also called directly by the P10 below-floor retry path.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use questflow_core::ports::LlmPort;
use questflow_core::{CancellationToken, OnFail, Phase, PhaseSpec, RetryPolicy, WorkflowContext};
use questflow_model::{ArticleInput, CompanyInput, ResearchBundle};

use crate::{keys, synthesis};

pub struct SynthesisPhase {
    spec: PhaseSpec,
    llm: Arc<dyn LlmPort>,
}

impl SynthesisPhase {
    #[must_use]
    pub fn article(llm: Arc<dyn LlmPort>) -> Self {
        Self {
            spec: PhaseSpec::new(
                "P5_synthesis",
                vec!["P3_graph_context".into()],
                Duration::from_secs(180),
                OnFail::Fatal,
            )
            .with_retry(RetryPolicy { max_attempts: 3, ..RetryPolicy::default() }),
            llm,
        }
    }

    /// Depends on `P_reresearch` in addition to `P3_graph_context`: the
    /// company workflow may rewrite the research bundle and ambiguity score
    /// during re-research, and synthesis must observe that rewrite rather
    /// than risk racing it as a sibling branch of the same dependency group.
    #[must_use]
    pub fn company(llm: Arc<dyn LlmPort>) -> Self {
        Self {
            spec: PhaseSpec::new(
                "P5_synthesis",
                vec!["P3_graph_context".into(), "P_reresearch".into()],
                Duration::from_secs(180),
                OnFail::Fatal,
            )
            .with_retry(RetryPolicy { max_attempts: 3, ..RetryPolicy::default() }),
            llm,
        }
    }
}

#[async_trait]
impl Phase for SynthesisPhase {
    fn spec(&self) -> &PhaseSpec {
        &self.spec
    }

    async fn run(&self, ctx: &mut WorkflowContext, _cancel: &CancellationToken) -> questflow_core::Result<()> {
        if crate::already_exited(ctx) {
            return Ok(());
        }
        let research: ResearchBundle = ctx.get(keys::RESEARCH).unwrap_or_default();
        let graph_context: Option<String> = ctx.get(keys::GRAPH_CONTEXT).flatten();
        let slug: String = ctx.get(keys::SLUG).unwrap_or_default();

        if let Some(input) = ctx.get::<ArticleInput>("input") {
            let payload =
                synthesis::synthesize_article(&*self.llm, &input, &research, graph_context.as_deref(), &slug).await?;
            ctx.insert(keys::PAYLOAD, payload)?;
            return Ok(());
        }

        let input: CompanyInput = ctx.get("input").ok_or_else(|| {
            questflow_core::QuestError::Other("synthesis requires either an article or company input".into())
        })?;
        let payload =
            synthesis::synthesize_profile(&*self.llm, &input, &research, graph_context.as_deref(), &slug).await?;
        ctx.insert(keys::PAYLOAD, payload)?;
        Ok(())
    }
}
