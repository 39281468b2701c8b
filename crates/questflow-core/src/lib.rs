//! Durable phase/activity workflow engine for the QuestFlow content pipeline.
//!
//! This crate defines the workflow-engine core: the phase contract, the
//! activity boundary through which all non-determinism (network, time,
//! randomness) must pass, the accumulating context that threads state across
//! phases, and the replay-from-history mechanics that make a suspended
//! workflow resumable without re-running completed activities.
//!
//! Concrete workflows (article, company) and concrete adapters (search,
//! research, crawler, LLM, image generation, store, graph) live in sibling
//! crates and are wired together behind the traits declared in [`ports`].
//!
//! # Example
//!
//! ```rust,ignore
//! use questflow_core::{CancellationToken, WorkflowContext, WorkflowEngine, WorkflowHistory, WorkflowOutcome};
//!
//! async fn run(phases: &[std::sync::Arc<dyn questflow_core::Phase>]) {
//!     let engine = WorkflowEngine::new();
//!     let ctx = WorkflowContext::new(workflow_id, workflow_type, input_json);
//!     let mut history = WorkflowHistory::new();
//!     let cancel = CancellationToken::new();
//!     match engine.run(phases, ctx, &mut history, &cancel).await {
//!         WorkflowOutcome::Completed(ctx) => { /* map ctx fields to a user-visible status */ }
//!         WorkflowOutcome::Failed { phase, error } => { /* terminal */ }
//!         WorkflowOutcome::Cancelled { .. } => { /* terminal */ }
//!     }
//! }
//! ```

pub mod activity;
pub mod cancellation;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod history;
pub mod phase;
pub mod ports;
pub mod retry;

pub use activity::{Activity, ActivityOutcome};
pub use cancellation::{CancellationToken, Cancelled};
pub use config::EngineConfig;
pub use context::WorkflowContext;
pub use engine::{WorkflowEngine, WorkflowOutcome};
pub use error::{ErrorCategory, QuestError};
pub use history::{PhaseRecord, WorkflowHistory};
pub use phase::{OnFail, Phase, PhaseOutcome, PhaseSpec};
pub use retry::RetryPolicy;

/// Result alias used throughout the engine and adapter crates.
pub type Result<T> = std::result::Result<T, QuestError>;
