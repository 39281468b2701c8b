//! P10 (shared): the persistence coordinator. Folds in the
//! sequencer's images and, for articles, the entity linker's mentions;
//! scores completeness; applies `config.below_floor_policy` when the score
//! misses its floor; then commits via `StorePort::upsert`, keyed by slug as
//! the idempotency handle.
//!
//! `Fatal` on failure: nothing downstream (graph sync) is worth attempting
//! against a run that never committed, and there is nothing to compensate
//! here since a failed `upsert` never touched the store.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use questflow_core::config::BelowFloorPolicy;
use questflow_core::ports::{LlmPort, StorePort, StoreUpsertOutcome, StoreUpsertRequest};
use questflow_core::{CancellationToken, EngineConfig, OnFail, Phase, PhaseSpec, QuestError, WorkflowContext, WorkflowEvent};
use questflow_model::{
    ArticleInput, ArticlePayload, CompanyInput, EditorialStatus, ImageBundle, MentionedCompany, ProfilePayload,
    ResearchBundle, WorkflowResult,
};
use questflow_scoring::{score_completeness, CompletenessProfile};

use crate::{synthesis, DedupeOutcome};
use crate::keys;

pub struct PersistencePhase {
    spec: PhaseSpec,
    store: Arc<dyn StorePort>,
    llm: Arc<dyn LlmPort>,
    config: Arc<EngineConfig>,
}

impl PersistencePhase {
    #[must_use]
    pub fn article(store: Arc<dyn StorePort>, llm: Arc<dyn LlmPort>, config: Arc<EngineConfig>) -> Self {
        Self {
            spec: PhaseSpec::new(
                "P10_persistence",
                vec!["P9_entities".into()],
                Duration::from_secs(30),
                OnFail::Fatal,
            ),
            store,
            llm,
            config,
        }
    }

    #[must_use]
    pub fn company(store: Arc<dyn StorePort>, llm: Arc<dyn LlmPort>, config: Arc<EngineConfig>) -> Self {
        Self {
            spec: PhaseSpec::new(
                "P10_persistence",
                vec!["P8_images".into()],
                Duration::from_secs(30),
                OnFail::Fatal,
            ),
            store,
            llm,
            config,
        }
    }
}

fn article_populated_fields(payload: &ArticlePayload) -> HashSet<&'static str> {
    let mut fields = HashSet::new();
    if !payload.title.is_empty() {
        fields.insert("title");
    }
    if !payload.markdown_body.is_empty() {
        fields.insert("markdown_body");
    }
    if !payload.excerpt.is_empty() {
        fields.insert("excerpt");
    }
    if !payload.sections.is_empty() {
        fields.insert("sections");
    }
    if !payload.meta_description.is_empty() {
        fields.insert("meta_description");
    }
    if !payload.tags.is_empty() {
        fields.insert("tags");
    }
    if payload.images.featured.is_some() {
        fields.insert("featured_image");
    }
    if payload.images.hero.is_some() {
        fields.insert("hero_image");
    }
    if payload.images.content.iter().any(Option::is_some) {
        fields.insert("content_images");
    }
    if !payload.mentioned_companies.is_empty() {
        fields.insert("mentioned_companies");
    }
    fields
}

fn profile_populated_fields(payload: &ProfilePayload) -> HashSet<&'static str> {
    let mut fields = HashSet::new();
    if !payload.legal_name.is_empty() {
        fields.insert("legal_name");
    }
    if !payload.domain.is_empty() {
        fields.insert("domain");
    }
    if !payload.company_type.is_empty() {
        fields.insert("company_type");
    }
    if !payload.profile_sections.is_empty() {
        fields.insert("profile_sections");
    }
    if payload.industry.is_some() {
        fields.insert("industry");
    }
    if payload.headquarters_country.is_some() {
        fields.insert("headquarters_country");
    }
    if payload.images.featured.is_some() {
        fields.insert("featured_image");
    }
    if payload.images.hero.is_some() {
        fields.insert("hero_image");
    }
    fields
}

#[async_trait]
impl Phase for PersistencePhase {
    fn spec(&self) -> &PhaseSpec {
        &self.spec
    }

    async fn run(&self, ctx: &mut WorkflowContext, _cancel: &CancellationToken) -> questflow_core::Result<()> {
        if crate::already_exited(ctx) {
            return Ok(());
        }
        let slug: String = ctx.get(keys::SLUG).unwrap_or_default();
        let app = crate::app_tag_of(ctx).to_string();
        let images: ImageBundle = ctx.get(keys::IMAGES).unwrap_or_default();
        let research: ResearchBundle = ctx.get(keys::RESEARCH).unwrap_or_default();
        let floor = self.config.completeness_floor(ctx.workflow_type.kind());

        if let Some(mut payload) = ctx.get::<ArticlePayload>(keys::PAYLOAD) {
            payload.images = images;
            payload.mentioned_companies = ctx.get::<Vec<MentionedCompany>>(keys::ENTITIES).unwrap_or_default();

            let mut populated = article_populated_fields(&payload);
            let mut score = score_completeness(&populated, &CompletenessProfile::article());

            if !score.meets_floor(floor) && self.config.below_floor_policy == BelowFloorPolicy::RetryThenDraft {
                if let Some(input) = ctx.get::<ArticleInput>("input") {
                    let graph_context: Option<String> = ctx.get(keys::GRAPH_CONTEXT).flatten();
                    if let Ok(retried) =
                        synthesis::synthesize_article(&*self.llm, &input, &research, graph_context.as_deref(), &slug).await
                    {
                        payload.title = retried.title;
                        payload.subtitle = retried.subtitle;
                        payload.markdown_body = retried.markdown_body;
                        payload.excerpt = retried.excerpt;
                        payload.sections = retried.sections;
                        payload.meta_description = retried.meta_description;
                        payload.word_count = retried.word_count;
                        payload.reading_time_minutes = retried.reading_time_minutes;
                        payload.tags = retried.tags;
                        populated = article_populated_fields(&payload);
                        score = score_completeness(&populated, &CompletenessProfile::article());
                    }
                }
            }
            payload.completeness_score = score;

            let below_floor = !score.meets_floor(floor);
            payload.editorial_status = if below_floor { EditorialStatus::Draft } else { EditorialStatus::Published };
            if below_floor {
                ctx.record_event(WorkflowEvent::new(
                    "P10_persistence",
                    "below_completeness_floor",
                    format!("article completeness {} below floor {floor}, persisting as draft", score.value()),
                ));
            }

            let dedupe: DedupeOutcome = ctx.get(keys::DEDUPE).unwrap_or(DedupeOutcome::New);
            let request = StoreUpsertRequest {
                kind: "article".to_string(),
                slug: slug.clone(),
                app,
                payload: serde_json::to_value(&payload)
                    .map_err(|e| QuestError::SchemaInvalid(format!("article payload not serializable: {e}")))?,
            };
            let response = self.store.upsert(request).await?;

            let result = match response.outcome {
                StoreUpsertOutcome::Conflict => WorkflowResult::Duplicate { slug: slug.clone() },
                _ if below_floor => WorkflowResult::Draft { slug: slug.clone(), completeness: score.value() },
                StoreUpsertOutcome::Created => WorkflowResult::Created { slug: slug.clone() },
                StoreUpsertOutcome::Updated => {
                    if dedupe == DedupeOutcome::Update {
                        WorkflowResult::Updated { slug: slug.clone() }
                    } else {
                        WorkflowResult::Created { slug: slug.clone() }
                    }
                }
            };

            ctx.insert(keys::COMPLETENESS, score.value())?;
            ctx.insert(keys::STORE_RESULT, result)?;
            ctx.compensate(keys::PAYLOAD, payload)?;
            return Ok(());
        }

        let Some(mut payload) = ctx.get::<ProfilePayload>(keys::PAYLOAD) else {
            return Err(QuestError::Other("persistence requires a payload to have been synthesized".into()));
        };
        payload.images = images;

        let mut populated = profile_populated_fields(&payload);
        let mut score = score_completeness(&populated, &CompletenessProfile::company());

        if !score.meets_floor(floor) && self.config.below_floor_policy == BelowFloorPolicy::RetryThenDraft {
            if let Some(input) = ctx.get::<CompanyInput>("input") {
                let graph_context: Option<String> = ctx.get(keys::GRAPH_CONTEXT).flatten();
                if let Ok(retried) =
                    synthesis::synthesize_profile(&*self.llm, &input, &research, graph_context.as_deref(), &slug).await
                {
                    payload.industry = retried.industry;
                    payload.headquarters_city = retried.headquarters_city;
                    payload.headquarters_country = retried.headquarters_country;
                    payload.profile_sections = retried.profile_sections;
                    payload.geographic_tags = retried.geographic_tags;
                    payload.specialization_tags = retried.specialization_tags;
                    payload.deal_tags = retried.deal_tags;
                    populated = profile_populated_fields(&payload);
                    score = score_completeness(&populated, &CompletenessProfile::company());
                }
            }
        }
        payload.completeness_score = score;
        let below_floor = !score.meets_floor(floor);
        if below_floor {
            ctx.record_event(WorkflowEvent::new(
                "P10_persistence",
                "below_completeness_floor",
                format!("company completeness {} below floor {floor}, persisting as draft", score.value()),
            ));
        }

        let dedupe: DedupeOutcome = ctx.get(keys::DEDUPE).unwrap_or(DedupeOutcome::New);
        let app = crate::app_tag_of(ctx).to_string();
        let request = StoreUpsertRequest {
            kind: "company".to_string(),
            slug: slug.clone(),
            app,
            payload: serde_json::to_value(&payload)
                .map_err(|e| QuestError::SchemaInvalid(format!("company payload not serializable: {e}")))?,
        };
        let response = self.store.upsert(request).await?;

        let result = match response.outcome {
            StoreUpsertOutcome::Conflict => WorkflowResult::Duplicate { slug: slug.clone() },
            _ if below_floor => WorkflowResult::Draft { slug: slug.clone(), completeness: score.value() },
            StoreUpsertOutcome::Created => WorkflowResult::Created { slug: slug.clone() },
            StoreUpsertOutcome::Updated => {
                if dedupe == DedupeOutcome::Update {
                    WorkflowResult::Updated { slug: slug.clone() }
                } else {
                    WorkflowResult::Created { slug: slug.clone() }
                }
            }
        };

        ctx.insert(keys::COMPLETENESS, score.value())?;
        ctx.insert(keys::STORE_RESULT, result)?;
        ctx.compensate(keys::PAYLOAD, payload)?;
        Ok(())
    }
}
