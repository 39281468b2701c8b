//! Deterministic normalization: slugs, URLs, and topic strings.
//!
//! Every function here is a pure transform with no adapter calls, so it can
//! be property-tested directly for the idempotence invariants the model
//! requires (slug idempotence under renormalization, URL canonicalization
//! idempotence).

pub mod diacritics;
pub mod slug;
pub mod topic;
pub mod url_canon;

pub use slug::slugify;
pub use topic::{normalize_topic, NormalizedTopic};
pub use url_canon::{canonicalize_url, UrlNormalizeError};
