//! Workflow trigger inputs: `ArticleInput` (topic → article) and
//! `CompanyInput` (URL → profile).

use serde::{Deserialize, Serialize};

use crate::{ModelError, Result};

/// App tag an article or company belongs to; scopes slug uniqueness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppTag {
    /// Relocation/immigration content.
    Placement,
    /// Relocation advisory content.
    Relocation,
    /// Chief-of-staff / executive support content.
    ChiefOfStaff,
    /// Consultancy content.
    Consultancy,
}

impl AppTag {
    /// Stable string form used in slugs and store keys.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            AppTag::Placement => "placement",
            AppTag::Relocation => "relocation",
            AppTag::ChiefOfStaff => "chief-of-staff",
            AppTag::Consultancy => "consultancy",
        }
    }
}

/// Output shape requested for an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArticleFormat {
    /// Long-form article.
    Article,
    /// Numbered listicle.
    Listicle,
    /// How-to guide.
    Guide,
    /// Comparative/analytical piece.
    Analysis,
}

/// Per-workflow behavior toggles carried on `ArticleInput`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ArticleFlags {
    /// Whether P2's crawlers should follow links beyond depth 0.
    pub deep_crawl: bool,
    /// Whether the image sequencer runs at all.
    pub generate_images: bool,
    /// Whether a completed article is published immediately vs. left as draft.
    pub auto_publish: bool,
    /// Skip both the P3 graph-context read and the P11 graph sync write.
    pub skip_graph_sync: bool,
}

const TOPIC_MIN_LEN: usize = 1;
const TOPIC_MAX_LEN: usize = 300;
const WORD_COUNT_MIN: u32 = 500;
const WORD_COUNT_MAX: u32 = 5000;
const WORD_COUNT_DEFAULT: u32 = 1500;
const BREADTH_MIN: u32 = 3;
const BREADTH_MAX: u32 = 20;

/// Trigger input for the article pipeline (topic → article).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleInput {
    /// The subject to write about, 1-300 characters.
    pub topic: String,
    /// App this article is scoped to.
    pub app_tag: AppTag,
    /// Target word count, 500-5000.
    pub target_word_count: u32,
    /// Requested output shape.
    pub format: ArticleFormat,
    /// Optional jurisdiction restricting research (ISO country code).
    pub jurisdiction: Option<String>,
    /// Number of sources to target in research fan-out, 3-20.
    pub research_breadth: u32,
    /// Behavior toggles.
    pub flags: ArticleFlags,
    /// Optional keyword list to bias synthesis.
    pub keywords: Vec<String>,
    /// Optional override for the generated meta description.
    pub meta_description_override: Option<String>,
    /// Byline.
    pub author: Option<String>,
    /// Editorial angle/stance guidance for the synthesizer.
    pub editorial_angle: Option<String>,
}

impl ArticleInput {
    /// Construct and validate an article input, applying the default
    /// `target_word_count` (1500) when `None` is supplied.
    pub fn try_new(
        topic: impl Into<String>,
        app_tag: AppTag,
        target_word_count: Option<u32>,
        format: ArticleFormat,
        research_breadth: u32,
    ) -> Result<Self> {
        let topic = topic.into();
        let topic_len = topic.chars().count();
        if !(TOPIC_MIN_LEN..=TOPIC_MAX_LEN).contains(&topic_len) {
            return Err(ModelError::InvalidField {
                field: "topic",
                reason: format!("length {topic_len} outside {TOPIC_MIN_LEN}..={TOPIC_MAX_LEN}"),
            });
        }

        let target_word_count = target_word_count.unwrap_or(WORD_COUNT_DEFAULT);
        if !(WORD_COUNT_MIN..=WORD_COUNT_MAX).contains(&target_word_count) {
            return Err(ModelError::InvalidField {
                field: "target_word_count",
                reason: format!("{target_word_count} outside {WORD_COUNT_MIN}..={WORD_COUNT_MAX}"),
            });
        }

        if !(BREADTH_MIN..=BREADTH_MAX).contains(&research_breadth) {
            return Err(ModelError::InvalidField {
                field: "research_breadth",
                reason: format!("{research_breadth} outside {BREADTH_MIN}..={BREADTH_MAX}"),
            });
        }

        Ok(Self {
            topic,
            app_tag,
            target_word_count,
            format,
            jurisdiction: None,
            research_breadth,
            flags: ArticleFlags::default(),
            keywords: Vec::new(),
            meta_description_override: None,
            author: None,
            editorial_angle: None,
        })
    }

    /// Minimum acceptable word count at persistence time (invariant 2:
    /// `word_count >= 0.85 * target_word_count`).
    #[must_use]
    pub fn minimum_word_count(&self) -> u32 {
        (f64::from(self.target_word_count) * 0.85).ceil() as u32
    }
}

/// Trigger input for the company pipeline (URL → profile).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyInput {
    /// Source URL; must parse to a valid host.
    pub url: String,
    /// Host extracted from `url` at construction time.
    pub host: String,
    /// Category used for ambiguity keyword-coverage scoring.
    pub category: String,
    /// Optional jurisdiction restricting research.
    pub jurisdiction: Option<String>,
    /// App this profile is scoped to.
    pub app_tag: AppTag,
    /// Whether an existing record for the same slug should be replaced.
    pub force_update: bool,
}

impl CompanyInput {
    /// Construct a company input, rejecting a URL that has no parseable host.
    pub fn try_new(url: impl Into<String>, category: impl Into<String>, app_tag: AppTag) -> Result<Self> {
        let url = url.into();
        let host = extract_host(&url).ok_or_else(|| ModelError::InvalidField {
            field: "url",
            reason: "could not parse a host from the URL".to_string(),
        })?;

        Ok(Self {
            url,
            host,
            category: category.into(),
            jurisdiction: None,
            app_tag,
            force_update: false,
        })
    }
}

/// Minimal host extraction without a full URL-parsing dependency in this
/// crate: `questflow-crawler`/`questflow-normalize` own canonicalization;
/// this only needs to decide whether a host is present at all.
fn extract_host(url: &str) -> Option<String> {
    let after_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let host_and_port = after_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or(after_scheme);
    let host = host_and_port.split(':').next().unwrap_or(host_and_port);
    if host.is_empty() || !host.contains('.') {
        None
    } else {
        Some(host.to_lowercase())
    }
}
