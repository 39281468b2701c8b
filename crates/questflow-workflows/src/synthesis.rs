//! The narrative-first synthesizer: prompt assembly against
//! `LlmPort`, schema-repair retry, and the word-count expansion retry for
//! articles. Shared by the P5 synthesis phase and the persistence
//! coordinator's below-floor re-synthesis path.
//!
//! Prompt text itself is a replaceable policy knob; the
//! prompts below are the minimal rendering needed to exercise the contract,
//! not a finished editorial voice.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::Deserialize;

use questflow_core::ports::{LlmPort, LlmRequest, LlmResponse};
use questflow_core::{QuestError, Result};
use questflow_model::{
    ArticleInput, ArticlePayload, ArticleSection, CompanyInput, CompletenessScore, ConfidenceScore,
    ImageBundle, ProfilePayload, ResearchBundle, ResearchMetadata, Section, Sentiment,
};

/// Placeholder confidence for a freshly-synthesized payload; the
/// persistence coordinator overwrites this once it scores completeness
/// and P10 is the phase of record for the final value.
#[allow(clippy::expect_used)]
fn zero_confidence() -> ConfidenceScore {
    ConfidenceScore::try_new(0.0).expect("0.0 is always a valid confidence score")
}

#[allow(clippy::expect_used)]
fn zero_completeness() -> CompletenessScore {
    CompletenessScore::try_new(0).expect("0 is always a valid completeness score")
}

const MAX_SCHEMA_REPAIR_ATTEMPTS: u32 = 3; // 1 initial + 2 repairs
const MAX_EXPANSION_ATTEMPTS: u32 = 3; // 1 initial + 2 expansions

#[derive(Debug, Deserialize)]
struct RawSection {
    h2_title: String,
    body: String,
    source_urls: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawArticle {
    title: String,
    subtitle: String,
    classification: String,
    tags: Vec<String>,
    meta_description: String,
    sections: Vec<RawSection>,
}

#[derive(Debug, Deserialize)]
struct RawProfileSection {
    title: String,
    markdown_content: String,
    source_urls: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawProfile {
    legal_name: String,
    company_type: String,
    industry: Option<String>,
    headquarters_city: Option<String>,
    headquarters_country: Option<String>,
    founded_year: Option<u32>,
    employee_range: Option<String>,
    geographic_tags: Vec<String>,
    specialization_tags: Vec<String>,
    deal_tags: Vec<String>,
    sections: Vec<RawProfileSection>,
}

fn article_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "required": ["title", "subtitle", "classification", "tags", "meta_description", "sections"],
    })
}

fn profile_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "required": ["legal_name", "company_type", "geographic_tags", "specialization_tags", "deal_tags", "sections"],
    })
}

async fn complete_structured<T: for<'de> Deserialize<'de>>(
    llm: &dyn LlmPort,
    mut prompt: String,
    schema: serde_json::Value,
    max_tokens: u32,
) -> Result<T> {
    for attempt in 1..=MAX_SCHEMA_REPAIR_ATTEMPTS {
        let request = LlmRequest { prompt: prompt.clone(), schema: Some(schema.clone()), max_tokens };
        match llm.complete(request).await {
            Ok(LlmResponse::Structured(value)) => {
                return serde_json::from_value(value).map_err(|e| {
                    QuestError::SchemaInvalid(format!("structured response did not match expected shape: {e}"))
                });
            }
            Ok(LlmResponse::Text(_)) if attempt < MAX_SCHEMA_REPAIR_ATTEMPTS => {
                prompt.push_str(
                    "\n\nYour previous response was not valid structured JSON. Respond with JSON matching the schema exactly, no prose.",
                );
            }
            Ok(LlmResponse::Text(_)) => {
                return Err(QuestError::SchemaInvalid(
                    "llm_complete returned free text after repair attempts exhausted".to_string(),
                ));
            }
            Err(QuestError::SchemaInvalid(detail)) if attempt < MAX_SCHEMA_REPAIR_ATTEMPTS => {
                prompt.push_str(&format!(
                    "\n\nYour previous response failed schema validation: {detail}. Correct it and respond again."
                ));
            }
            Err(e) => return Err(e),
        }
    }
    Err(QuestError::SchemaInvalid("schema repair attempts exhausted".to_string()))
}

/// Citable URLs actually present in the research bundle. A claim-bearing
/// section may only cite one of these — the synthesizer "never invents
/// citations".
fn citable_urls(research: &ResearchBundle) -> HashSet<String> {
    research.all_citable_items().iter().filter_map(|item| item.url.clone()).collect()
}

fn word_count(sections: &[ArticleSection]) -> u32 {
    sections.iter().map(|s| s.body.split_whitespace().count() as u32).sum()
}

fn reading_time_minutes(word_count: u32) -> u32 {
    (word_count / 200).max(1)
}

fn excerpt_from(sections: &[ArticleSection], meta_description: &str) -> String {
    sections
        .first()
        .map(|s| s.body.split_whitespace().take(40).collect::<Vec<_>>().join(" "))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| meta_description.to_string())
}

/// Run one synthesis attempt (no expansion retry) and assemble the payload,
/// dropping any section whose citations don't survive the bundle check and
/// computing section confidence from source diversity.
async fn synthesize_article_once(
    llm: &dyn LlmPort,
    input: &ArticleInput,
    research: &ResearchBundle,
    graph_context: Option<&str>,
    directive: &str,
    slug: &str,
) -> Result<ArticlePayload> {
    let prompt = format!(
        "Write a {format:?} article of at least {words} words on: {topic}\nEvidence sources: {sources} items.\nGraph context: {ctx}\n{directive}",
        format = input.format,
        words = input.target_word_count,
        topic = input.topic,
        sources = research.all_citable_items().len(),
        ctx = graph_context.unwrap_or("(none)"),
    );
    let max_tokens = (input.target_word_count * 2).max(512);
    let raw: RawArticle = complete_structured(llm, prompt, article_schema(), max_tokens).await?;
    let known_urls = citable_urls(research);

    let sections: Vec<ArticleSection> = raw
        .sections
        .into_iter()
        .filter_map(|s| {
            let valid_urls: Vec<String> = s.source_urls.into_iter().filter(|u| known_urls.contains(u)).collect();
            if valid_urls.is_empty() || s.body.trim().is_empty() {
                return None;
            }
            Some(ArticleSection {
                h2_title: s.h2_title,
                body: s.body,
                sentiment: Sentiment::default(),
                image_index: None,
            })
        })
        .collect();

    if sections.is_empty() {
        return Err(QuestError::Empty("synthesis produced no citable sections".to_string()));
    }

    let wc = word_count(&sections);
    let data_sources: Vec<String> = known_urls.into_iter().collect();

    Ok(ArticlePayload {
        title: raw.title,
        subtitle: raw.subtitle,
        slug: slug.to_string(),
        markdown_body: sections.iter().map(|s| format!("## {}\n\n{}", s.h2_title, s.body)).collect::<Vec<_>>().join("\n\n"),
        excerpt: excerpt_from(&sections, &raw.meta_description),
        sections,
        classification: raw.classification,
        tags: raw.tags,
        meta_description: raw.meta_description,
        word_count: wc,
        reading_time_minutes: reading_time_minutes(wc),
        images: ImageBundle::default(),
        editorial_status: questflow_model::EditorialStatus::Draft,
        published_at: None,
        mentioned_companies: Vec::new(),
        research: ResearchMetadata {
            confidence: zero_confidence(),
            research_cost: research.total_cost_usd(),
            ambiguity_signals: Vec::new(),
            data_sources,
        },
        completeness_score: zero_completeness(),
    })
}

/// Synthesize an article, retrying with an explicit expansion directive up
/// to twice when the draft falls short of the word-count floor.
pub(crate) async fn synthesize_article(
    llm: &dyn LlmPort,
    input: &ArticleInput,
    research: &ResearchBundle,
    graph_context: Option<&str>,
    slug: &str,
) -> Result<ArticlePayload> {
    let mut directive = String::new();
    let mut last_payload: Option<ArticlePayload> = None;

    for attempt in 1..=MAX_EXPANSION_ATTEMPTS {
        let payload = synthesize_article_once(llm, input, research, graph_context, &directive, slug).await?;
        if payload.meets_word_count_floor(input.target_word_count) {
            return Ok(payload);
        }
        directive = format!(
            "The previous draft was only {} words; the minimum is {}. Expand every section with additional supported detail.",
            payload.word_count,
            input.minimum_word_count(),
        );
        last_payload = Some(payload);
        if attempt == MAX_EXPANSION_ATTEMPTS {
            break;
        }
    }

    Err(QuestError::SchemaInvalid(format!(
        "article draft remained below the {} word floor after {} attempts (last: {} words)",
        input.minimum_word_count(),
        MAX_EXPANSION_ATTEMPTS,
        last_payload.map(|p| p.word_count).unwrap_or(0),
    )))
}

/// Synthesize a company profile. Profiles have no word-count floor, only
/// the schema-repair retry shared with articles.
pub(crate) async fn synthesize_profile(
    llm: &dyn LlmPort,
    input: &CompanyInput,
    research: &ResearchBundle,
    graph_context: Option<&str>,
    slug: &str,
) -> Result<ProfilePayload> {
    let prompt = format!(
        "Write a company profile for the organization at {url} (category: {category}).\nEvidence sources: {sources} items.\nGraph context: {ctx}",
        url = input.url,
        category = input.category,
        sources = research.all_citable_items().len(),
        ctx = graph_context.unwrap_or("(none)"),
    );
    let max_tokens = 2048;
    let raw: RawProfile = complete_structured(llm, prompt, profile_schema(), max_tokens).await?;
    let known_urls = citable_urls(research);

    let mut profile_sections: IndexMap<String, Section> = IndexMap::new();
    for (idx, s) in raw.sections.into_iter().enumerate() {
        let valid_urls: Vec<String> = s.source_urls.into_iter().filter(|u| known_urls.contains(u)).collect();
        if valid_urls.is_empty() {
            continue;
        }
        let confidence = questflow_scoring::section_confidence(valid_urls.len(), valid_urls.len().min(4));
        if let Ok(section) = Section::try_new(s.title.clone(), s.markdown_content, confidence, valid_urls) {
            profile_sections.insert(format!("section_{idx}"), section);
        }
    }

    Ok(ProfilePayload {
        legal_name: raw.legal_name,
        domain: input.host.clone(),
        slug: slug.to_string(),
        company_type: raw.company_type,
        website: input.url.clone(),
        industry: raw.industry,
        headquarters_city: raw.headquarters_city,
        headquarters_country: raw.headquarters_country,
        founded_year: raw.founded_year,
        employee_range: raw.employee_range,
        geographic_tags: raw.geographic_tags,
        specialization_tags: raw.specialization_tags,
        deal_tags: raw.deal_tags,
        profile_sections,
        images: ImageBundle::default(),
        research: ResearchMetadata {
            confidence: zero_confidence(),
            research_cost: research.total_cost_usd(),
            ambiguity_signals: Vec::new(),
            data_sources: known_urls.into_iter().collect(),
        },
        completeness_score: zero_completeness(),
    })
}
