//! Addresses a thread and optionally one checkpoint within it.

use serde::{Deserialize, Serialize};

/// Identifies the thread and optional checkpoint for a store or checkpointer call.
///
/// **Interaction**: Passed to `Checkpointer::put` / `get_tuple` / `list`;
/// carried in `StateSnapshot::config` and `parent_config`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnableConfig {
    /// Required by every checkpointer.
    pub thread_id: Option<String>,
    /// If set, load this checkpoint instead of the latest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint_id: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub checkpoint_ns: String,
}

impl RunnableConfig {
    pub fn for_thread(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: Some(thread_id.into()),
            ..Default::default()
        }
    }

    pub fn with_checkpoint(mut self, checkpoint_id: impl Into<String>) -> Self {
        self.checkpoint_id = Some(checkpoint_id.into());
        self
    }
}
