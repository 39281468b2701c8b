//! Company-only "article backfill" step: re-link previously
//! published articles that mention this company once its profile exists or
//! changes.
//!
//! [`questflow_core::ports::StorePort`] declares exactly three operations —
//! `upsert`, `delete_by_slug`, `exists` — none of which can list or search
//! existing articles by mentioned-company id. There is no adapter call this
//! phase could make that the contract actually supports, so implementing
//! "real" backfill here would mean inventing a capability no port exposes.
//! This phase is therefore an honest, always-soft-skipped no-op: it records
//! why backfill did not run rather than silently pretending to have done
//! it. See DESIGN.md for the accompanying Open Question decision.

use std::time::Duration;

use async_trait::async_trait;
use questflow_core::{CancellationToken, OnFail, Phase, PhaseSpec, WorkflowContext, WorkflowEvent};

pub struct BackfillPhase {
    spec: PhaseSpec,
}

impl BackfillPhase {
    #[must_use]
    pub fn new() -> Self {
        Self {
            spec: PhaseSpec::new("P_backfill", vec!["P10_persistence".into()], Duration::from_secs(5), OnFail::SoftSkip),
        }
    }
}

impl Default for BackfillPhase {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Phase for BackfillPhase {
    fn spec(&self) -> &PhaseSpec {
        &self.spec
    }

    async fn run(&self, ctx: &mut WorkflowContext, _cancel: &CancellationToken) -> questflow_core::Result<()> {
        if crate::already_exited(ctx) {
            return Ok(());
        }
        ctx.record_event(WorkflowEvent::new(
            "P_backfill",
            "backfill_unsupported",
            "store_upsert has no query-by-mentioned-company capability; article backfill skipped".to_string(),
        ));
        Ok(())
    }
}
