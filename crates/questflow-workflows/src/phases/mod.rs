//! Concrete [`questflow_core::Phase`] implementations, one module per
//! pipeline step. Each phase struct holds only the
//! ports and config it actually calls, cloned out of the [`crate::Ports`]
//! bundle when [`crate::article::run_article_workflow`] or
//! [`crate::company::run_company_workflow`] compiles the phase list.

pub mod ambiguity;
pub mod backfill;
pub mod entities;
pub mod graph_context;
pub mod graph_sync;
pub mod images;
pub mod link_cleanse;
pub mod normalize_article;
pub mod normalize_company;
pub mod persistence;
pub mod reresearch;
pub mod research;
pub mod sentiment;
pub mod synthesis_phase;
pub mod url_validate;
