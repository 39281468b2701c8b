//! P8: the chained image sequencer, shared by both workflows
//! and parameterized by `EngineConfig::image_count`. Featured, then hero,
//! then (articles only) up to five content images, each referencing the
//! prior image's URL for visual consistency. `on_fail: PartialOk` — a slot
//! whose generation is exhausted is simply left `None`
//! ([`questflow_model::ImageBundle`] documents this as the expected shape
//! for E5).

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use questflow_core::ports::{ImageAspect, ImageGeneratePort, ImageGenerateRequest};
use questflow_core::{CancellationToken, EngineConfig, OnFail, Phase, PhaseSpec, WorkflowContext, WorkflowEvent};
use questflow_model::{ArticlePayload, ImageBundle, ImageRecord, ProfilePayload, Sentiment};

use crate::fingerprint::image_fingerprint;
use crate::keys;

enum Subject {
    Article(ArticlePayload),
    Profile(ProfilePayload),
}

impl Subject {
    fn title(&self) -> &str {
        match self {
            Subject::Article(p) => &p.title,
            Subject::Profile(p) => &p.legal_name,
        }
    }

    fn mood(&self) -> &'static str {
        match self {
            Subject::Article(p) => {
                let (mut pos, mut neg) = (0, 0);
                for section in &p.sections {
                    match section.sentiment {
                        Sentiment::Positive => pos += 1,
                        Sentiment::Negative => neg += 1,
                        Sentiment::Mixed | Sentiment::Neutral => {}
                    }
                }
                if pos > neg {
                    "bright, optimistic"
                } else if neg > pos {
                    "muted, serious"
                } else {
                    "neutral, editorial"
                }
            }
            Subject::Profile(_) => "professional, corporate",
        }
    }
}

pub struct ImageSequencerPhase {
    spec: PhaseSpec,
    port: Arc<dyn ImageGeneratePort>,
    config: Arc<EngineConfig>,
    kind: &'static str,
}

impl ImageSequencerPhase {
    #[must_use]
    pub fn article(port: Arc<dyn ImageGeneratePort>, config: Arc<EngineConfig>) -> Self {
        Self {
            spec: PhaseSpec::new(
                "P8_images",
                vec!["P7_link_cleanse".into()],
                Duration::from_secs(600),
                OnFail::PartialOk,
            ),
            port,
            config,
            kind: "article",
        }
    }

    #[must_use]
    pub fn company(port: Arc<dyn ImageGeneratePort>, config: Arc<EngineConfig>) -> Self {
        Self {
            spec: PhaseSpec::new(
                "P8_images",
                vec!["P5_synthesis".into()],
                Duration::from_secs(600),
                OnFail::PartialOk,
            ),
            port,
            config,
            kind: "company",
        }
    }

    async fn generate_one(
        &self,
        prompt: String,
        reference_url: Option<String>,
        aspect: ImageAspect,
        seen: &mut HashSet<String>,
    ) -> Option<ImageRecord> {
        let response = self
            .port
            .generate(ImageGenerateRequest { prompt: prompt.clone(), reference_url: reference_url.clone(), aspect })
            .await
            .ok()?;

        let fp = image_fingerprint(response.seed, &prompt, reference_url.as_deref());
        if !seen.insert(fp) {
            tracing::warn!(prompt = %prompt, "duplicate image fingerprint within one sequencer run, dropping slot");
            return None;
        }

        Some(ImageRecord {
            url: response.url,
            alt: prompt.clone(),
            description: prompt,
            title: "".to_string(),
        })
    }
}

#[async_trait]
impl Phase for ImageSequencerPhase {
    fn spec(&self) -> &PhaseSpec {
        &self.spec
    }

    async fn run(&self, ctx: &mut WorkflowContext, _cancel: &CancellationToken) -> questflow_core::Result<()> {
        if crate::already_exited(ctx) {
            return Ok(());
        }

        let subject = if self.kind == "article" {
            ctx.get::<ArticlePayload>(keys::PAYLOAD).map(Subject::Article)
        } else {
            ctx.get::<ProfilePayload>(keys::PAYLOAD).map(Subject::Profile)
        };
        let Some(subject) = subject else {
            return Ok(());
        };

        let total = self.config.image_count(self.kind);
        if total == 0 {
            return Ok(());
        }

        let title = subject.title().to_string();
        let mood = subject.mood();
        let mut seen = HashSet::new();
        let mut reference: Option<String> = None;
        let mut dropped = 0u32;

        let featured_prompt = format!("Featured image for \"{title}\", {mood} mood, 1200x630");
        let featured = self.generate_one(featured_prompt, None, ImageAspect::Featured, &mut seen).await;
        if featured.is_none() {
            dropped += 1;
        } else {
            reference = featured.as_ref().map(|r| r.url.clone());
        }

        let hero = if total >= 2 {
            let prompt = format!("Hero image for \"{title}\", {mood} mood, 16:9, consistent with the featured image");
            let img = self.generate_one(prompt, reference.clone(), ImageAspect::Hero, &mut seen).await;
            if img.is_none() {
                dropped += 1;
            } else {
                reference = img.as_ref().map(|r| r.url.clone());
            }
            img
        } else {
            None
        };

        let content_count = total.saturating_sub(2);
        let mut content = Vec::with_capacity(usize::from(content_count));
        for i in 1..=content_count {
            let prompt = format!("Content image {i} for \"{title}\", {mood} mood, consistent with prior images");
            let img = self.generate_one(prompt, reference.clone(), ImageAspect::Content, &mut seen).await;
            if img.is_none() {
                dropped += 1;
            } else {
                reference = img.as_ref().map(|r| r.url.clone());
            }
            content.push(img);
        }

        if dropped > 0 {
            ctx.record_event(WorkflowEvent::new(
                "P8_images",
                "image_slots_dropped",
                format!("{dropped} of {total} image slot(s) failed or deduplicated"),
            ));
        }

        let images = ImageBundle { featured, hero, content };
        ctx.insert(keys::IMAGES, images)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use questflow_core::context::WorkflowType;
    use questflow_model::{CompletenessScore, ConfidenceScore, EditorialStatus, ResearchMetadata};
    use questflow_testing::MockImageGeneratePort;

    use super::*;

    fn sample_article() -> ArticlePayload {
        ArticlePayload {
            title: "Digital Nomad Visa Greece".into(),
            subtitle: "s".into(),
            slug: "digital-nomad-visa-greece".into(),
            markdown_body: "body".into(),
            excerpt: "e".into(),
            sections: vec![],
            classification: "article".into(),
            tags: vec![],
            meta_description: "m".into(),
            word_count: 1600,
            reading_time_minutes: 8,
            images: ImageBundle::default(),
            editorial_status: EditorialStatus::Draft,
            published_at: None,
            mentioned_companies: vec![],
            research: ResearchMetadata {
                confidence: ConfidenceScore::try_new(0.8).unwrap(),
                research_cost: 0.0,
                ambiguity_signals: vec![],
                data_sources: vec![],
            },
            completeness_score: CompletenessScore::try_new(70).unwrap(),
        }
    }

    fn ctx_with_payload(payload: ArticlePayload) -> WorkflowContext {
        let mut ctx = WorkflowContext::new("wf-1", WorkflowType::Article, serde_json::json!({}));
        ctx.insert(keys::PAYLOAD, payload).unwrap();
        ctx
    }

    /// Invariant 10: a sequence of length N (here the default article count
    /// of 7) produces N distinct fingerprints — every slot is filled and
    /// none is dropped as a duplicate, even though the mock adapter returns
    /// the same URL and seed for every call; the prompt text alone (which
    /// differs per slot) is enough to keep fingerprints distinct.
    #[tokio::test]
    async fn seven_image_sequence_has_seven_distinct_slots() {
        let port = Arc::new(MockImageGeneratePort::new());
        let config = Arc::new(EngineConfig::default());
        let phase = ImageSequencerPhase::article(port, config);

        let mut ctx = ctx_with_payload(sample_article());
        phase.run(&mut ctx, &CancellationToken::new()).await.unwrap();

        let images: ImageBundle = ctx.get(keys::IMAGES).unwrap();
        assert!(images.featured.is_some());
        assert!(images.hero.is_some());
        assert_eq!(images.content.len(), 5);
        assert!(images.content.iter().all(Option::is_some), "no slot should be dropped when every prompt is distinct");
        assert!(ctx.events().iter().all(|e| e.code != "image_slots_dropped"));
    }

    /// E5: a persistently-failing slot is left `None` and the rest of the
    /// sequence proceeds; the dropped count is recorded as an event.
    #[tokio::test]
    async fn a_failing_slot_is_left_none_and_recorded() {
        let port = Arc::new(MockImageGeneratePort::new());
        port.fail_next("CONTENT_POLICY");
        // The first call (featured) consumes the one-shot failure; the rest
        // of the sequence proceeds normally.
        let config = Arc::new(EngineConfig::default());
        let phase = ImageSequencerPhase::article(port, config);

        let mut ctx = ctx_with_payload(sample_article());
        phase.run(&mut ctx, &CancellationToken::new()).await.unwrap();

        let images: ImageBundle = ctx.get(keys::IMAGES).unwrap();
        assert!(images.featured.is_none());
        assert!(images.hero.is_some());
        assert!(ctx.events().iter().any(|e| e.code == "image_slots_dropped"));
    }

}
