//! P7 (article only): drop markdown links whose target failed P4's
//! liveness check. Soft-skip — an article with a few
//! dead links is still publishable, just less useful.

use std::time::Duration;

use async_trait::async_trait;
use questflow_core::ports::UrlValidation;
use questflow_core::{CancellationToken, OnFail, Phase, PhaseSpec, WorkflowContext, WorkflowEvent};
use questflow_model::ArticlePayload;

use crate::keys;

pub struct LinkCleansePhase {
    spec: PhaseSpec,
}

impl LinkCleansePhase {
    #[must_use]
    pub fn new() -> Self {
        Self {
            spec: PhaseSpec::new(
                "P7_link_cleanse",
                vec!["P6_sentiment".into(), "P4_url_validate".into()],
                Duration::from_secs(60),
                OnFail::SoftSkip,
            ),
        }
    }
}

impl Default for LinkCleansePhase {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether a validated URL is dead: unreachable (`status == 0`) or any
/// client/server error status.
fn is_dead(validation: &UrlValidation) -> bool {
    validation.status == 0 || validation.status >= 400
}

/// Strip `[text](url)` markdown links whose `url` is in `dead_urls`,
/// keeping the link text. Returns the cleaned body and how many were
/// removed.
fn strip_dead_links(body: &str, dead_urls: &[String]) -> (String, usize) {
    let mut result = String::with_capacity(body.len());
    let mut removed = 0;
    let mut rest = body;

    while let Some(bracket_start) = rest.find('[') {
        let Some(bracket_end) = rest[bracket_start..].find(']') else {
            result.push_str(rest);
            return (result, removed);
        };
        let bracket_end = bracket_start + bracket_end;

        if rest.as_bytes().get(bracket_end + 1) != Some(&b'(') {
            result.push_str(&rest[..=bracket_end]);
            rest = &rest[bracket_end + 1..];
            continue;
        }
        let Some(paren_end) = rest[bracket_end + 2..].find(')') else {
            result.push_str(rest);
            return (result, removed);
        };
        let paren_end = bracket_end + 2 + paren_end;

        let link_text = &rest[bracket_start + 1..bracket_end];
        let url = &rest[bracket_end + 2..paren_end];

        result.push_str(&rest[..bracket_start]);
        if dead_urls.iter().any(|d| d == url) {
            result.push_str(link_text);
            removed += 1;
        } else {
            result.push_str(&rest[bracket_start..=paren_end]);
        }
        rest = &rest[paren_end + 1..];
    }
    result.push_str(rest);
    (result, removed)
}

#[async_trait]
impl Phase for LinkCleansePhase {
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
        let validations: Vec<UrlValidation> = ctx.get(keys::URL_VALIDATIONS).unwrap_or_default();
        let dead_urls: Vec<String> = validations.iter().filter(|v| is_dead(v)).map(|v| v.url.clone()).collect();

        if dead_urls.is_empty() {
            return Ok(());
        }

        let (cleaned, removed) = strip_dead_links(&payload.markdown_body, &dead_urls);
        if removed > 0 {
            payload.markdown_body = cleaned;
            ctx.record_event(WorkflowEvent::new(
                "P7_link_cleanse",
                "dead_links_removed",
                format!("removed {removed} dead link(s)"),
            ));
        }

        ctx.compensate(keys::PAYLOAD, payload)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_only_dead_links() {
        let body = "See [the report](https://dead.example/a) and [the source](https://live.example/b).";
        let (cleaned, removed) = strip_dead_links(body, &["https://dead.example/a".to_string()]);
        assert_eq!(removed, 1);
        assert!(cleaned.contains("See the report and [the source](https://live.example/b)."));
    }
}
