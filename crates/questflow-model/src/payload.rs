//! Narrative-first payloads: [`ProfilePayload`] (company) and
//! [`ArticlePayload`] (article). Optional prose sections exist only when
//! evidence supports them — consumers must tolerate absent sections rather
//! than treating every facet as a nullable scalar.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{CompletenessScore, ConfidenceScore, ModelError, Result};

/// Minimum sentence count for a narrative section to be considered present.
const SECTION_MIN_SENTENCES: usize = 2;
/// Minimum confidence for a narrative section to be considered present.
const SECTION_MIN_CONFIDENCE: f64 = 0.5;

/// One narrative section of a profile or article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// Section heading.
    pub title: String,
    /// Body content in markdown.
    pub markdown_content: String,
    /// Confidence this section's content is well-supported.
    pub confidence: ConfidenceScore,
    /// Source URLs backing claims in this section.
    pub source_urls: Vec<String>,
}

impl Section {
    /// Construct a section, rejecting content that doesn't meet the
    /// narrative-first presence bar (>= 2 sentences, confidence >= 0.5).
    /// Callers that can't meet the bar should omit the section entirely
    /// rather than constructing a low-quality placeholder.
    pub fn try_new(
        title: impl Into<String>,
        markdown_content: impl Into<String>,
        confidence: ConfidenceScore,
        source_urls: Vec<String>,
    ) -> Result<Self> {
        let markdown_content = markdown_content.into();
        if sentence_count(&markdown_content) < SECTION_MIN_SENTENCES {
            return Err(ModelError::InvalidField {
                field: "markdown_content",
                reason: format!("fewer than {SECTION_MIN_SENTENCES} sentences"),
            });
        }
        if confidence.value() < SECTION_MIN_CONFIDENCE {
            return Err(ModelError::InvalidField {
                field: "confidence",
                reason: format!("{} below the section presence floor {SECTION_MIN_CONFIDENCE}", confidence.value()),
            });
        }
        Ok(Self {
            title: title.into(),
            markdown_content,
            confidence,
            source_urls,
        })
    }
}

fn sentence_count(text: &str) -> usize {
    text.split(['.', '!', '?'])
        .filter(|s| !s.trim().is_empty())
        .count()
}

/// One generated image's metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Generated image URL.
    pub url: String,
    /// Accessibility alt text.
    pub alt: String,
    /// Longer description.
    pub description: String,
    /// Display title.
    pub title: String,
}

/// The image bundle shape shared by both payloads: a featured image, a hero
/// image, and up to five content images. A `None` slot means that
/// generation failed persistently for that slot and the rest of the
/// sequence proceeded without it (E5).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageBundle {
    /// 1200x630 featured image.
    pub featured: Option<ImageRecord>,
    /// 16:9 hero image.
    pub hero: Option<ImageRecord>,
    /// Up to five 4:3 or 1:1 content images, in sequence order.
    pub content: Vec<Option<ImageRecord>>,
}

impl ImageBundle {
    /// Whether the image at 1-indexed `image_index` exists (invariant 3).
    #[must_use]
    pub fn has_image(&self, image_index: u8) -> bool {
        if image_index == 0 {
            return false;
        }
        self.content
            .get(usize::from(image_index) - 1)
            .is_some_and(Option::is_some)
    }
}

/// Research-quality metadata carried alongside a payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchMetadata {
    /// Overall confidence in the synthesized content.
    pub confidence: ConfidenceScore,
    /// Total monetary cost of the research that backed this payload.
    pub research_cost: f64,
    /// Ambiguity signal values that fed the company pipeline's confidence
    /// calculation, empty for articles.
    pub ambiguity_signals: Vec<f64>,
    /// Distinct adapter/origin identifiers that contributed research.
    pub data_sources: Vec<String>,
}

/// Narrative-first company profile payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfilePayload {
    /// Registered/legal name.
    pub legal_name: String,
    /// Primary domain.
    pub domain: String,
    /// URL-safe slug, unique within `(app, "company")`.
    pub slug: String,
    /// Free-form company type (e.g. "placement agency").
    pub company_type: String,
    /// Canonical website URL.
    pub website: String,
    /// Industry classification, when known.
    pub industry: Option<String>,
    /// Headquarters city, when known.
    pub headquarters_city: Option<String>,
    /// Headquarters country, when known.
    pub headquarters_country: Option<String>,
    /// Founding year, when known.
    pub founded_year: Option<u32>,
    /// Employee count bucket (e.g. "11-50"), when known.
    pub employee_range: Option<String>,
    /// Free-form geography tags.
    pub geographic_tags: Vec<String>,
    /// Free-form specialization tags.
    pub specialization_tags: Vec<String>,
    /// Free-form deal-type tags.
    pub deal_tags: Vec<String>,
    /// Ordered narrative sections, keyed by a stable section key
    /// (e.g. `"overview"`, `"services"`). Order is insertion order and is
    /// meaningful for rendering.
    pub profile_sections: IndexMap<String, Section>,
    /// Generated images (featured + hero for companies; see
    /// `EngineConfig::image_count_company`).
    pub images: ImageBundle,
    /// Research-quality metadata.
    pub research: ResearchMetadata,
    /// Overall completeness score.
    pub completeness_score: CompletenessScore,
}

/// Sentiment classification of an article section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    /// Positive tone.
    Positive,
    /// Negative tone.
    Negative,
    /// Neutral tone.
    Neutral,
    /// Mixed tone.
    Mixed,
}

impl Default for Sentiment {
    fn default() -> Self {
        Self::Neutral
    }
}

/// One body section of an article, distinct from [`Section`]: carries
/// sentiment and an optional link to a sequenced image rather than a
/// confidence/source-url pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleSection {
    /// H2-level heading.
    pub h2_title: String,
    /// Body content in markdown.
    pub body: String,
    /// Sentiment for this section, defaulting to neutral when P6 is soft-skipped.
    pub sentiment: Sentiment,
    /// 1-indexed reference into the content image sequence, or `None`.
    pub image_index: Option<u8>,
}

/// A linked mention of a company within an article (the junction row's
/// in-payload counterpart; the junction table itself lives in the store).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MentionedCompany {
    /// Id of the linked company record.
    pub company_id: u64,
    /// Relevance of the mention.
    pub relevance: ConfidenceScore,
}

/// Publication state of an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditorialStatus {
    /// Below-floor completeness or not yet reviewed.
    Draft,
    /// Live.
    Published,
    /// Retired.
    Archived,
}

/// Article payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticlePayload {
    /// Headline.
    pub title: String,
    /// Deck/subtitle.
    pub subtitle: String,
    /// URL-safe slug, unique within `(app, "article")`.
    pub slug: String,
    /// Full markdown body.
    pub markdown_body: String,
    /// Short excerpt for listings.
    pub excerpt: String,
    /// Body sections.
    pub sections: Vec<ArticleSection>,
    /// Free-form classification (e.g. maps to `ArticleFormat`).
    pub classification: String,
    /// Free-form tags.
    pub tags: Vec<String>,
    /// SEO meta description.
    pub meta_description: String,
    /// Computed word count.
    pub word_count: u32,
    /// Estimated reading time in minutes.
    pub reading_time_minutes: u32,
    /// Generated images (7 for articles).
    pub images: ImageBundle,
    /// Editorial status.
    pub editorial_status: EditorialStatus,
    /// Publish timestamp, RFC 3339, set only once `editorial_status` is `Published`.
    pub published_at: Option<String>,
    /// Linked company mentions.
    pub mentioned_companies: Vec<MentionedCompany>,
    /// Research-quality metadata.
    pub research: ResearchMetadata,
    /// Overall completeness score.
    pub completeness_score: CompletenessScore,
}

impl ArticlePayload {
    /// Invariant 2: word count must meet the 0.85x target floor at
    /// persistence time.
    #[must_use]
    pub fn meets_word_count_floor(&self, target_word_count: u32) -> bool {
        f64::from(self.word_count) >= f64::from(target_word_count) * 0.85
    }

    /// Invariant 3: every section's `image_index` is null or refers to an
    /// existing generated image.
    #[must_use]
    pub fn has_valid_image_references(&self) -> bool {
        self.sections.iter().all(|section| match section.image_index {
            None => true,
            Some(idx) => (1..=5).contains(&idx) && self.images.has_image(idx),
        })
    }

    /// Invariant 5: every mentioned company carries a relevance in `[0, 1]`
    /// (enforced by construction via [`ConfidenceScore`]) — resolution
    /// against the company store happens in the linking phase, not here.
    #[must_use]
    pub fn mentioned_company_ids(&self) -> Vec<u64> {
        self.mentioned_companies.iter().map(|m| m.company_id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn confidence(v: f64) -> ConfidenceScore {
        ConfidenceScore::try_new(v).unwrap()
    }

    #[test]
    fn section_requires_two_sentences_and_confidence_floor() {
        assert!(Section::try_new("Overview", "One sentence only", confidence(0.8), vec![]).is_err());
        assert!(Section::try_new("Overview", "First sentence. Second sentence.", confidence(0.4), vec![]).is_err());
        assert!(Section::try_new("Overview", "First sentence. Second sentence.", confidence(0.5), vec![]).is_ok());
    }

    #[test]
    fn image_bundle_reports_presence_by_index() {
        let bundle = ImageBundle {
            featured: None,
            hero: None,
            content: vec![
                Some(ImageRecord { url: "u1".into(), alt: "a".into(), description: "d".into(), title: "t".into() }),
                None,
                Some(ImageRecord { url: "u3".into(), alt: "a".into(), description: "d".into(), title: "t".into() }),
            ],
        };
        assert!(bundle.has_image(1));
        assert!(!bundle.has_image(2));
        assert!(bundle.has_image(3));
        assert!(!bundle.has_image(4));
        assert!(!bundle.has_image(0));
    }

    #[test]
    fn article_word_count_floor_matches_085_multiplier() {
        let mut payload = sample_article_payload();
        payload.word_count = 1275;
        assert!(payload.meets_word_count_floor(1500));
        payload.word_count = 1274;
        assert!(!payload.meets_word_count_floor(1500));
    }

    #[test]
    fn dangling_image_index_is_detected() {
        let mut payload = sample_article_payload();
        payload.sections.push(ArticleSection {
            h2_title: "H".into(),
            body: "b".into(),
            sentiment: Sentiment::Neutral,
            image_index: Some(3),
        });
        assert!(!payload.has_valid_image_references());
    }

    fn sample_article_payload() -> ArticlePayload {
        ArticlePayload {
            title: "t".into(),
            subtitle: "s".into(),
            slug: "slug".into(),
            markdown_body: "body".into(),
            excerpt: "e".into(),
            sections: vec![],
            classification: "article".into(),
            tags: vec![],
            meta_description: "m".into(),
            word_count: 1500,
            reading_time_minutes: 7,
            images: ImageBundle::default(),
            editorial_status: EditorialStatus::Draft,
            published_at: None,
            mentioned_companies: vec![],
            research: ResearchMetadata {
                confidence: confidence(0.8),
                research_cost: 0.0,
                ambiguity_signals: vec![],
                data_sources: vec![],
            },
            completeness_score: CompletenessScore::try_new(70).unwrap(),
        }
    }
}
