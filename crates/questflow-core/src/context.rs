//! The accumulating state object threaded through a workflow run.
//!
//! Each phase may only *append* to the context — no field is ever
//! overwritten except by an explicit compensation step (see
//! [`WorkflowContext::compensate`]). This mirrors a `MergeableState`
//! combined at parallel join points, generalized to an open field set
//! since the engine is polymorphic over the article and company
//! workflows rather than over one fixed state struct per graph.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::QuestError;

/// Which sibling workflow a context belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowType {
    /// Topic → article pipeline.
    Article,
    /// URL → company profile pipeline.
    Company,
}

impl WorkflowType {
    /// Record kind string used in store/events (`"article"` | `"company"`).
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            WorkflowType::Article => "article",
            WorkflowType::Company => "company",
        }
    }
}

/// A non-fatal occurrence recorded alongside a successful payload: a
/// soft-skip, a re-research trigger, an image failure, etc.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkflowEvent {
    /// Phase that raised the event.
    pub phase: String,
    /// Short machine-readable code, e.g. `"below_completeness_floor"`.
    pub code: String,
    /// Human-readable detail.
    pub detail: String,
}

impl WorkflowEvent {
    /// Construct an event.
    pub fn new(phase: impl Into<String>, code: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            phase: phase.into(),
            code: code.into(),
            detail: detail.into(),
        }
    }
}

/// The accumulating, append-only context carried between phases.
///
/// Fields are stored as JSON so the engine can remain polymorphic over the
/// two workflow variants; typed accessors (`get`/`insert`) serialize and
/// deserialize through [`serde_json::Value`] at the boundary, the same way
/// the persistence coordinator carries a JSON-typed payload column for
/// forward compatibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowContext {
    /// Stable identifier for this workflow instance (equals the derived
    /// slug once P1 has run, or a random id before that).
    pub workflow_id: String,
    /// Which sibling workflow this context belongs to.
    pub workflow_type: WorkflowType,
    fields: HashMap<String, Value>,
    events: Vec<WorkflowEvent>,
}

impl WorkflowContext {
    /// Start a fresh context carrying only the raw input.
    #[must_use]
    pub fn new(workflow_id: impl Into<String>, workflow_type: WorkflowType, input: Value) -> Self {
        let mut fields = HashMap::new();
        fields.insert("input".to_string(), input);
        Self {
            workflow_id: workflow_id.into(),
            workflow_type,
            fields,
            events: Vec::new(),
        }
    }

    /// Append a new field. Fails if `key` is already present — a phase may
    /// only add new state, never silently overwrite another phase's output.
    /// Use [`WorkflowContext::compensate`] for the one sanctioned exception.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Serialize) -> crate::Result<()> {
        let key = key.into();
        if self.fields.contains_key(&key) {
            return Err(QuestError::Other(format!(
                "context field '{key}' already set; phases may only append"
            )));
        }
        let value = serde_json::to_value(value)
            .map_err(|e| QuestError::Other(format!("failed to serialize '{key}': {e}")))?;
        self.fields.insert(key, value);
        Ok(())
    }

    /// Overwrite a field that was already set, for the compensation path
    /// only (e.g. a retried phase replacing its own prior partial output).
    pub fn compensate(&mut self, key: impl Into<String>, value: impl Serialize) -> crate::Result<()> {
        let value = serde_json::to_value(value)
            .map_err(|e| QuestError::Other(format!("failed to serialize compensation value: {e}")))?;
        self.fields.insert(key.into(), value);
        Ok(())
    }

    /// Read a field back out, deserializing into `T`.
    pub fn get<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        self.fields
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Whether a field has been set yet.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Fork a context for one parallel branch: carries the same fields but
    /// starts with an empty event log, so `merge` only appends events the
    /// branch newly recorded rather than re-appending everything already
    /// present before the fan-out.
    #[must_use]
    pub(crate) fn branch(&self) -> Self {
        Self {
            workflow_id: self.workflow_id.clone(),
            workflow_type: self.workflow_type,
            fields: self.fields.clone(),
            events: Vec::new(),
        }
    }

    /// Record a soft-skip or informational event.
    pub fn record_event(&mut self, event: WorkflowEvent) {
        self.events.push(event);
    }

    /// All events recorded so far, in recording order.
    #[must_use]
    pub fn events(&self) -> &[WorkflowEvent] {
        &self.events
    }

    /// Merge the fields and events produced by a parallel branch into this
    /// context. Used at fan-out join points (e.g. the four-way P2 research
    /// fan-out): each branch runs against a clone of the pre-fan-out
    /// context and is merged back at the barrier. A key present in both
    /// contexts keeps `self`'s value and records a conflict event rather
    /// than silently picking one — parallel branches are expected to write
    /// disjoint keys.
    pub fn merge(&mut self, other: WorkflowContext) {
        for (key, value) in other.fields {
            if self.fields.contains_key(&key) {
                if self.fields.get(&key) != Some(&value) {
                    self.events.push(WorkflowEvent::new(
                        "merge",
                        "context_merge_conflict",
                        format!("key '{key}' written by more than one parallel branch"),
                    ));
                }
                continue;
            }
            self.fields.insert(key, value);
        }
        self.events.extend(other.events);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn insert_then_get_roundtrips() {
        let mut ctx = WorkflowContext::new("wf-1", WorkflowType::Article, json!({"topic": "x"}));
        ctx.insert("slug", "digital-nomad-visa-greece").unwrap();
        assert_eq!(ctx.get::<String>("slug").as_deref(), Some("digital-nomad-visa-greece"));
    }

    #[test]
    fn insert_rejects_overwrite() {
        let mut ctx = WorkflowContext::new("wf-1", WorkflowType::Article, json!({}));
        ctx.insert("slug", "a").unwrap();
        assert!(ctx.insert("slug", "b").is_err());
    }

    #[test]
    fn compensate_allows_overwrite() {
        let mut ctx = WorkflowContext::new("wf-1", WorkflowType::Article, json!({}));
        ctx.insert("slug", "a").unwrap();
        ctx.compensate("slug", "b").unwrap();
        assert_eq!(ctx.get::<String>("slug").as_deref(), Some("b"));
    }

    #[test]
    fn merge_combines_disjoint_branch_fields() {
        let base = WorkflowContext::new("wf-1", WorkflowType::Article, json!({}));
        let mut news = base.clone();
        news.insert("news_search", vec!["a"]).unwrap();
        let mut research = base.clone();
        research.insert("deep_research", vec!["b"]).unwrap();

        let mut merged = base;
        merged.merge(news);
        merged.merge(research);

        assert_eq!(merged.get::<Vec<String>>("news_search"), Some(vec!["a".to_string()]));
        assert_eq!(merged.get::<Vec<String>>("deep_research"), Some(vec!["b".to_string()]));
        assert!(merged.events().is_empty());
    }

    #[test]
    fn merge_records_conflict_on_divergent_duplicate_key() {
        let base = WorkflowContext::new("wf-1", WorkflowType::Article, json!({}));
        let mut branch_a = base.clone();
        branch_a.insert("x", 1).unwrap();
        let mut branch_b = base.clone();
        branch_b.insert("x", 2).unwrap();

        let mut merged = base;
        merged.merge(branch_a);
        merged.merge(branch_b);

        assert_eq!(merged.get::<i32>("x"), Some(1));
        assert_eq!(merged.events().len(), 1);
        assert_eq!(merged.events()[0].code, "context_merge_conflict");
    }
}
