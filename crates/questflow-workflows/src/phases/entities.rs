//! P9 (article only): entity linking against the company directory.
//! Dictionary/NER-lite extraction, relevance scoring, then
//! resolution in three tiers: exact slug match, fuzzy name match (edit
//! distance ≤ 0.15 via [`crate::textsim::normalized_edit_distance`]), then
//! domain match against any host found in the research bundle's citable
//! URLs.
//!
//! [`questflow_core::ports::StorePort`] exposes no numeric primary key —
//! only `exists`/`upsert`/`delete_by_slug` keyed by slug — so there is no
//! adapter call that returns a `u64` id for a resolved slug. Rather than
//! invent a lookup the store contract doesn't offer, `company_id` here is
//! derived deterministically from the resolved slug the same way P3/P11
//! derive `graph_id` from `(app, slug)`: a stable handle, not the store's
//! real row id.

use std::time::Duration;

use async_trait::async_trait;
use questflow_core::{CancellationToken, OnFail, Phase, PhaseSpec, WorkflowContext};
use questflow_model::{ArticlePayload, ConfidenceScore, MentionedCompany, ResearchBundle};

use crate::keys;
use crate::textsim::normalized_edit_distance;

const FUZZY_NAME_THRESHOLD: f64 = 0.15;
const MIN_RELEVANCE: f64 = 0.3;

pub struct EntityLinkPhase {
    spec: PhaseSpec,
    /// Known company directory entries: (slug, display name, domain).
    /// Populated from `questflow_core::EngineConfig` callers wire up, or
    /// left empty when no directory is configured (the phase then finds
    /// nothing, which is an expected, soft-skipped outcome).
    directory: Vec<(String, String, Option<String>)>,
}

impl EntityLinkPhase {
    #[must_use]
    pub fn new(directory: Vec<(String, String, Option<String>)>) -> Self {
        Self {
            spec: PhaseSpec::new("P9_entities", vec!["P8_images".into()], Duration::from_secs(30), OnFail::SoftSkip),
            directory,
        }
    }

    fn candidate_id(slug: &str) -> u64 {
        let hash = blake3::hash(slug.as_bytes());
        let bytes = hash.as_bytes();
        u64::from_le_bytes(bytes[..8].try_into().expect("blake3 digest is at least 8 bytes"))
    }

    /// Score one directory entry's relevance against the article body:
    /// mention frequency (capped), an earlier-mention bonus, and a name
    /// match bonus, combined into `[0, 1]`.
    fn relevance(body_lower: &str, name_lower: &str) -> f64 {
        let count = body_lower.matches(name_lower).count();
        if count == 0 {
            return 0.0;
        }
        let frequency_score = (count as f64 / 5.0).min(0.6);
        let position_bonus = if body_lower.find(name_lower).map(|i| i < body_lower.len() / 3).unwrap_or(false) {
            0.2
        } else {
            0.0
        };
        (0.2 + frequency_score + position_bonus).min(1.0)
    }

    fn resolve(&self, name_hint: &str, research: &ResearchBundle) -> Option<(String, f64)> {
        let name_lower = name_hint.to_lowercase();

        if let Some((slug, _, _)) = self.directory.iter().find(|(slug, _, _)| slug.eq_ignore_ascii_case(&name_lower)) {
            return Some((slug.clone(), 1.0));
        }

        let mut best: Option<(&str, f64)> = None;
        for (slug, display_name, _) in &self.directory {
            let distance = normalized_edit_distance(&name_lower, &display_name.to_lowercase());
            if distance <= FUZZY_NAME_THRESHOLD && best.map(|(_, best_d)| distance < best_d).unwrap_or(true) {
                best = Some((slug, distance));
            }
        }
        if let Some((slug, _)) = best {
            return Some((slug.to_string(), 0.85));
        }

        let hosts: Vec<String> = research
            .all_citable_items()
            .into_iter()
            .filter_map(|item| item.url.as_deref())
            .filter_map(|url| url.split("://").nth(1))
            .filter_map(|rest| rest.split('/').next())
            .map(|h| h.trim_start_matches("www.").to_lowercase())
            .collect();
        for (slug, _, domain) in &self.directory {
            let Some(domain) = domain else { continue };
            if hosts.iter().any(|h| h == &domain.to_lowercase()) {
                return Some((slug.clone(), 0.7));
            }
        }
        None
    }
}

#[async_trait]
impl Phase for EntityLinkPhase {
    fn spec(&self) -> &PhaseSpec {
        &self.spec
    }

    async fn run(&self, ctx: &mut WorkflowContext, _cancel: &CancellationToken) -> questflow_core::Result<()> {
        if crate::already_exited(ctx) {
            return Ok(());
        }
        let Some(payload) = ctx.get::<ArticlePayload>(keys::PAYLOAD) else {
            return Ok(());
        };
        if self.directory.is_empty() {
            ctx.insert(keys::ENTITIES, Vec::<MentionedCompany>::new())?;
            return Ok(());
        }

        let research: ResearchBundle = ctx.get(keys::RESEARCH).unwrap_or_default();
        let body_lower = payload.markdown_body.to_lowercase();

        let mut mentions = Vec::new();
        for (slug, display_name, _domain) in &self.directory {
            let name_lower = display_name.to_lowercase();
            let score = Self::relevance(&body_lower, &name_lower);
            if score < MIN_RELEVANCE {
                continue;
            }
            let Some((resolved_slug, resolution_confidence)) = self.resolve(display_name, &research) else {
                continue;
            };
            debug_assert_eq!(&resolved_slug, slug);
            let relevance = ConfidenceScore::try_new((score * resolution_confidence).clamp(0.0, 1.0))
                .unwrap_or(ConfidenceScore::try_new(0.0).expect("0.0 is always valid"));
            mentions.push(MentionedCompany { company_id: Self::candidate_id(&resolved_slug), relevance });
        }

        ctx.insert(keys::ENTITIES, mentions)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relevance_requires_minimum_mentions() {
        let body = "this article never discusses the company by name".to_lowercase();
        assert_eq!(EntityLinkPhase::relevance(&body, "acme corp"), 0.0);
    }

    #[test]
    fn relevance_rewards_early_frequent_mentions() {
        let body = "acme corp leads the market. acme corp also expanded. acme corp is notable.".to_lowercase();
        let score = EntityLinkPhase::relevance(&body, "acme corp");
        assert!(score > 0.5, "expected strong relevance, got {score}");
    }
}
