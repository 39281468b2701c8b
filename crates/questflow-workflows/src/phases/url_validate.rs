//! P4 (article only): liveness/redirect check on every citable source URL
//! gathered by P2; the link-cleanse step consumes this output. Soft-skip —
//! a validation failure just means P7 later treats those URLs as
//! unvalidated rather than halting the run.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use questflow_core::ports::UrlValidatePort;
use questflow_core::{CancellationToken, OnFail, Phase, PhaseSpec, WorkflowContext};
use questflow_model::ResearchBundle;

use crate::keys;

pub struct UrlValidatePhase {
    spec: PhaseSpec,
    port: Arc<dyn UrlValidatePort>,
}

impl UrlValidatePhase {
    #[must_use]
    pub fn new(port: Arc<dyn UrlValidatePort>) -> Self {
        Self {
            spec: PhaseSpec::new(
                "P4_url_validate",
                vec!["P2_join".into()],
                Duration::from_secs(60),
                OnFail::SoftSkip,
            ),
            port,
        }
    }
}

#[async_trait]
impl Phase for UrlValidatePhase {
    fn spec(&self) -> &PhaseSpec {
        &self.spec
    }

    async fn run(&self, ctx: &mut WorkflowContext, _cancel: &CancellationToken) -> questflow_core::Result<()> {
        if crate::already_exited(ctx) {
            return Ok(());
        }
        let Some(research) = ctx.get::<ResearchBundle>(keys::RESEARCH) else {
            ctx.insert(keys::URL_VALIDATIONS, Vec::<questflow_core::ports::UrlValidation>::new())?;
            return Ok(());
        };

        let urls: Vec<String> = research.all_citable_items().iter().filter_map(|i| i.url.clone()).collect();
        if urls.is_empty() {
            ctx.insert(keys::URL_VALIDATIONS, Vec::<questflow_core::ports::UrlValidation>::new())?;
            return Ok(());
        }

        let validations = self.port.validate(urls).await?;
        ctx.insert(keys::URL_VALIDATIONS, validations)?;
        Ok(())
    }
}
