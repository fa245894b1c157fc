//! Checkpointer trait and CheckpointError.

use async_trait::async_trait;

use crate::memory::checkpoint::{Checkpoint, CheckpointListItem, CheckpointMetadata};
use crate::memory::config::RunnableConfig;

/// Error type for checkpoint operations.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("thread_id required")]
    ThreadIdRequired,
    #[error("serialization: {0}")]
    Serialization(String),
    #[error("storage: {0}")]
    Storage(String),
    #[error("checkpoint not found: {0}")]
    NotFound(String),
}

/// Saves and loads checkpoints by (thread_id, checkpoint_ns, checkpoint_id).
///
/// Implementations: [`MemorySaver`](super::MemorySaver) and
/// [`SqliteSaver`](super::SqliteSaver).
///
/// **Interaction**: Owned by `ConversationStore`, which writes one checkpoint
/// per appended message.
#[async_trait]
pub trait Checkpointer<S>: Send + Sync
where
    S: Clone + Send + Sync + 'static,
{
    /// Persist a checkpoint for the thread. Returns the checkpoint id used.
    async fn put(
        &self,
        config: &RunnableConfig,
        checkpoint: &Checkpoint<S>,
    ) -> Result<String, CheckpointError>;

    /// Load the latest checkpoint for the thread (or the one given by `config.checkpoint_id`).
    async fn get_tuple(
        &self,
        config: &RunnableConfig,
    ) -> Result<Option<(Checkpoint<S>, CheckpointMetadata)>, CheckpointError>;

    /// Checkpoints of the thread, oldest first. `before` cuts the list at that id
    /// (exclusive); `limit` keeps the newest `n`.
    async fn list(
        &self,
        config: &RunnableConfig,
        limit: Option<usize>,
        before: Option<&str>,
    ) -> Result<Vec<CheckpointListItem>, CheckpointError>;
}

/// Applies `before` then `limit` to an oldest-first list.
pub(crate) fn window(
    mut items: Vec<CheckpointListItem>,
    limit: Option<usize>,
    before: Option<&str>,
) -> Vec<CheckpointListItem> {
    if let Some(b) = before {
        if let Some(pos) = items.iter().position(|i| i.checkpoint_id == b) {
            items.truncate(pos);
        }
    }
    if let Some(n) = limit {
        let len = items.len();
        if len > n {
            items.drain(..len - n);
        }
    }
    items
}
