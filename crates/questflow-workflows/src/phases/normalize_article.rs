//! P1 (article): topic normalization, slug derivation, and the existence
//! check. Fatal on failure — nothing downstream can run without
//! a canonical slug.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use questflow_core::ports::StorePort;
use questflow_core::{CancellationToken, OnFail, Phase, PhaseSpec, QuestError, RetryPolicy, WorkflowContext};
use questflow_model::ArticleInput;
use questflow_normalize::{normalize_topic, slugify};

use crate::{keys, DedupeOutcome};

pub struct NormalizeArticlePhase {
    spec: PhaseSpec,
    store: Arc<dyn StorePort>,
}

impl NormalizeArticlePhase {
    #[must_use]
    pub fn new(store: Arc<dyn StorePort>) -> Self {
        Self {
            spec: PhaseSpec::new("P1_normalize", vec![], Duration::from_secs(15), OnFail::Fatal)
                .with_retry(RetryPolicy::none()),
            store,
        }
    }
}

#[async_trait]
impl Phase for NormalizeArticlePhase {
    fn spec(&self) -> &PhaseSpec {
        &self.spec
    }

    async fn run(&self, ctx: &mut WorkflowContext, _cancel: &CancellationToken) -> questflow_core::Result<()> {
        let input: ArticleInput = ctx
            .get("input")
            .ok_or_else(|| QuestError::InputInvalid("missing article input".to_string()))?;

        let normalized = normalize_topic(&input.topic);
        let slug = slugify(&normalized.canonical);
        if slug.is_empty() {
            return Err(QuestError::NormalizationFailed(format!(
                "topic '{}' normalized to an empty slug",
                input.topic
            )));
        }

        let app = input.app_tag.as_str();
        let exists = self.store.exists("article", app, &slug).await?;
        let dedupe = if exists { DedupeOutcome::Exists } else { DedupeOutcome::New };

        if exists {
            tracing::info!(slug = %slug, app = %app, "article already exists, downstream phases will exit early");
        }

        ctx.insert(keys::CANONICAL_TOPIC, &normalized.canonical)?;
        ctx.insert(keys::SLUG, &slug)?;
        ctx.insert(keys::DEDUPE, dedupe)?;
        Ok(())
    }
}
