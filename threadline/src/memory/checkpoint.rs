//! Checkpoint and metadata types.
//!
//! One checkpoint per append: the full conversation after the write, plus
//! source, step, creation time, parent id and the write that produced it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Source of the checkpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointSource {
    /// Caller input (a human message).
    #[default]
    Input,
    /// Written by the turn controller (AI or tool message).
    Loop,
}

impl CheckpointSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckpointSource::Input => "input",
            CheckpointSource::Loop => "loop",
        }
    }

    /// Unknown strings map to `Loop`.
    pub fn parse(s: &str) -> Self {
        match s {
            "input" => CheckpointSource::Input,
            _ => CheckpointSource::Loop,
        }
    }
}

/// Metadata for a single checkpoint.
///
/// **Interaction**: Returned by `Checkpointer::list` and embedded in
/// `StateSnapshot` for history views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    pub source: CheckpointSource,
    /// 0 for the first checkpoint of a thread, +1 per append.
    pub step: i64,
    pub created_at: DateTime<Utc>,
    /// Checkpoint this one supersedes; `None` for the first.
    pub parent_id: Option<String>,
    /// The write (serialized message) that produced this checkpoint.
    pub writes: Option<Value>,
}

/// One entry of `Checkpointer::list`.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointListItem {
    pub checkpoint_id: String,
    pub metadata: CheckpointMetadata,
}

/// Checkpoint: id (UUID v7, time-ordered), state, metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint<S> {
    pub id: String,
    pub channel_values: S,
    pub metadata: CheckpointMetadata,
}

impl<S> Checkpoint<S> {
    /// New checkpoint following `parent` (or the first of its thread).
    pub fn from_state(
        state: S,
        source: CheckpointSource,
        parent: Option<&Checkpoint<S>>,
        writes: Option<Value>,
    ) -> Self {
        let (step, parent_id) = match parent {
            Some(p) => (p.metadata.step + 1, Some(p.id.clone())),
            None => (0, None),
        };
        Self {
            id: Uuid::now_v7().to_string(),
            channel_values: state,
            metadata: CheckpointMetadata {
                source,
                step,
                created_at: Utc::now(),
                parent_id,
                writes,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_checkpoint_has_step_zero_and_no_parent() {
        let cp = Checkpoint::from_state(1u8, CheckpointSource::Input, None, None);
        assert_eq!(cp.metadata.step, 0);
        assert!(cp.metadata.parent_id.is_none());
        let id = Uuid::parse_str(&cp.id).unwrap();
        assert_eq!(id.get_version_num(), 7);
    }

    #[test]
    fn child_checkpoint_links_parent_and_increments_step() {
        let parent = Checkpoint::from_state(1u8, CheckpointSource::Input, None, None);
        let child = Checkpoint::from_state(
            2u8,
            CheckpointSource::Loop,
            Some(&parent),
            Some(serde_json::json!({"role": "ai"})),
        );
        assert_eq!(child.metadata.step, 1);
        assert_eq!(child.metadata.parent_id.as_deref(), Some(parent.id.as_str()));
        assert_ne!(child.id, parent.id);
    }

    #[test]
    fn source_string_round_trip() {
        assert_eq!(CheckpointSource::parse(CheckpointSource::Input.as_str()), CheckpointSource::Input);
        assert_eq!(CheckpointSource::parse(CheckpointSource::Loop.as_str()), CheckpointSource::Loop);
        assert_eq!(CheckpointSource::parse("fork"), CheckpointSource::Loop);
    }
}
