//! P1 (company): URL canonicalization, slug derivation, and the
//! existence/force_update check. `force_update = true` against
//! an existing record resolves to [`DedupeOutcome::Update`]; otherwise an
//! existing record resolves to [`DedupeOutcome::Exists`] and the run exits
//! early via [`crate::already_exited`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use questflow_core::ports::StorePort;
use questflow_core::{CancellationToken, OnFail, Phase, PhaseSpec, QuestError, RetryPolicy, WorkflowContext};
use questflow_model::CompanyInput;
use questflow_normalize::{canonicalize_url, slugify};

use crate::{keys, DedupeOutcome};

pub struct NormalizeCompanyPhase {
    spec: PhaseSpec,
    store: Arc<dyn StorePort>,
}

impl NormalizeCompanyPhase {
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
impl Phase for NormalizeCompanyPhase {
    fn spec(&self) -> &PhaseSpec {
        &self.spec
    }

    async fn run(&self, ctx: &mut WorkflowContext, _cancel: &CancellationToken) -> questflow_core::Result<()> {
        let input: CompanyInput = ctx
            .get("input")
            .ok_or_else(|| QuestError::InputInvalid("missing company input".to_string()))?;

        let canonical_url = canonicalize_url(&input.url)
            .map_err(|e| QuestError::NormalizationFailed(format!("url '{}': {e}", input.url)))?;
        let slug = slugify(&input.host);
        if slug.is_empty() {
            return Err(QuestError::NormalizationFailed(format!(
                "host '{}' normalized to an empty slug",
                input.host
            )));
        }

        let app = input.app_tag.as_str();
        let exists = self.store.exists("company", app, &slug).await?;
        let dedupe = match (exists, input.force_update) {
            (false, _) => DedupeOutcome::New,
            (true, true) => DedupeOutcome::Update,
            (true, false) => DedupeOutcome::Exists,
        };

        if matches!(dedupe, DedupeOutcome::Exists) {
            tracing::info!(slug = %slug, app = %app, "company already exists and force_update is false, exiting early");
        }

        ctx.insert(keys::CANONICAL_URL, &canonical_url)?;
        ctx.insert(keys::SLUG, &slug)?;
        ctx.insert(keys::DEDUPE, dedupe)?;
        Ok(())
    }
}
