//! P6 (article only): per-section sentiment classification.
//! Soft-skip — every section defaults to `Neutral` already
//! ([`Sentiment::default`]), so a failure here just leaves that default in
//! place rather than blocking the run.

use std::time::Duration;

use async_trait::async_trait;
use questflow_core::{CancellationToken, OnFail, Phase, PhaseSpec, WorkflowContext};
use questflow_model::{ArticlePayload, Sentiment};

use crate::keys;

pub struct SentimentPhase {
    spec: PhaseSpec,
}

impl SentimentPhase {
    #[must_use]
    pub fn new() -> Self {
        Self {
            spec: PhaseSpec::new(
                "P6_sentiment",
                vec!["P5_synthesis".into()],
                Duration::from_secs(30),
                OnFail::SoftSkip,
            ),
        }
    }
}

impl Default for SentimentPhase {
    fn default() -> Self {
        Self::new()
    }
}

/// Lexicon-free heuristic: count a small set of polarity-bearing words
/// case-insensitively. Good enough to exercise the contract; a production
/// deployment would route this through `LlmPort` or a real classifier, which
/// is a policy choice this crate defers.
fn classify(body: &str) -> Sentiment {
    const POSITIVE: &[&str] = &["growth", "success", "launch", "expand", "record", "win", "improve"];
    const NEGATIVE: &[&str] = &["decline", "lawsuit", "layoff", "loss", "investigation", "delay", "risk"];

    let lower = body.to_lowercase();
    let positive = POSITIVE.iter().filter(|w| lower.contains(*w)).count();
    let negative = NEGATIVE.iter().filter(|w| lower.contains(*w)).count();

    match (positive > 0, negative > 0) {
        (true, true) => Sentiment::Mixed,
        (true, false) => Sentiment::Positive,
        (false, true) => Sentiment::Negative,
        (false, false) => Sentiment::Neutral,
    }
}

#[async_trait]
impl Phase for SentimentPhase {
    fn spec(&self) -> &PhaseSpec {
        &self.spec
    }

    async fn run(&self, ctx: &mut WorkflowContext, _cancel: &CancellationToken) -> questflow_core::Result<()> {
        if crate::already_exited(ctx) {
            return Ok(());
        }
        let Some(mut payload) = ctx.get::<ArticlePayload>(keys::PAYLOAD) else {
            return Ok(());
        };

        for section in &mut payload.sections {
            section.sentiment = classify(&section.body);
        }

        ctx.compensate(keys::PAYLOAD, payload)?;
        Ok(())
    }
}
