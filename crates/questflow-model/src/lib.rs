//! Data model for the QuestFlow content pipeline: workflow inputs, the
//! research bundle produced by the P2 fan-out, and the narrative-first
//! article/company payloads the synthesizer produces.
//!
//! Types here carry only the invariants that are representable in the type
//! system (score ranges, non-empty slugs, image-index bounds); invariants
//! that depend on store state (slug uniqueness, company resolution) are
//! enforced by the workflow and persistence crates that have access to
//! that state.

pub mod input;
pub mod payload;
pub mod research;
pub mod result;
pub mod score;

pub use input::{AppTag, ArticleFlags, ArticleInput, ArticleFormat, CompanyInput};
pub use payload::{
    ArticlePayload, EditorialStatus, ImageBundle, ImageRecord, ProfilePayload, Section, Sentiment,
};
pub use research::{ResearchBundle, ResearchItem, SourceBundle, SourceKind};
pub use result::WorkflowResult;
pub use score::{CompletenessScore, ConfidenceScore};

/// Errors raised while constructing or validating model types. Distinct
/// from [`questflow_core::QuestError`] — model validation is a pure,
/// synchronous concern and this crate carries no async/activity machinery.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
#[non_exhaustive]
pub enum ModelError {
    /// A required field was empty or out of its declared bounds.
    #[error("field '{field}' invalid: {reason}")]
    InvalidField {
        /// Name of the offending field.
        field: &'static str,
        /// Why it's invalid.
        reason: String,
    },
    /// A score was outside its declared numeric range.
    #[error("score '{field}' = {value} is out of range {min}..={max}")]
    ScoreOutOfRange {
        /// Name of the offending field.
        field: &'static str,
        /// The value supplied.
        value: f64,
        /// Minimum allowed value.
        min: f64,
        /// Maximum allowed value.
        max: f64,
    },
    /// A section's `image_index` referenced an image slot that doesn't exist.
    #[error("section image_index {index} has no corresponding generated image (1..={max})")]
    DanglingImageIndex {
        /// The offending index.
        index: u8,
        /// Highest valid index.
        max: u8,
    },
}

/// Result alias for model validation.
pub type Result<T> = std::result::Result<T, ModelError>;
