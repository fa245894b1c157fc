//! Per-thread conversation store on top of a [`Checkpointer`].
//!
//! Every append writes a new checkpoint holding the whole conversation, so the
//! latest checkpoint is the current state and older ones are its history.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::memory::checkpoint::{Checkpoint, CheckpointMetadata, CheckpointSource};
use crate::memory::checkpointer::{CheckpointError, Checkpointer};
use crate::memory::config::RunnableConfig;
use crate::memory::memory_saver::MemorySaver;
use crate::memory::thread_locks::ThreadLocks;
use crate::message::Message;
use crate::state::Conversation;

/// Point-in-time view of one thread.
///
/// `next` is `["model"]` after a human or tool message, `["tools"]` after an AI
/// message with tool calls, and empty once a turn is done.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateSnapshot {
    pub values: Conversation,
    pub next: Vec<String>,
    /// Thread id plus the id of this checkpoint (none for an unknown thread).
    pub config: RunnableConfig,
    /// `None` for an unknown thread.
    pub metadata: Option<CheckpointMetadata>,
    pub created_at: Option<DateTime<Utc>>,
    pub parent_config: Option<RunnableConfig>,
}

impl StateSnapshot {
    fn empty(thread_id: &str) -> Self {
        Self {
            values: Conversation::new(thread_id),
            next: Vec::new(),
            config: RunnableConfig::for_thread(thread_id),
            metadata: None,
            created_at: None,
            parent_config: None,
        }
    }

    fn from_checkpoint(thread_id: &str, checkpoint: Checkpoint<Conversation>) -> Self {
        let Checkpoint {
            id,
            channel_values,
            metadata,
        } = checkpoint;
        Self {
            next: channel_values.next_actions(),
            values: channel_values,
            config: RunnableConfig::for_thread(thread_id).with_checkpoint(id),
            created_at: Some(metadata.created_at),
            parent_config: metadata
                .parent_id
                .clone()
                .map(|pid| RunnableConfig::for_thread(thread_id).with_checkpoint(pid)),
            metadata: Some(metadata),
        }
    }

    /// Step counter; -1 for a thread with no checkpoints.
    pub fn step(&self) -> i64 {
        self.metadata.as_ref().map(|m| m.step).unwrap_or(-1)
    }

    pub fn checkpoint_id(&self) -> Option<&str> {
        self.config.checkpoint_id.as_deref()
    }
}

/// Append-only conversation log per thread id.
///
/// Appends for one thread are serialized by a per-thread lock held across the
/// read-modify-write; different threads proceed in parallel. Lock entries are
/// dropped once no append on that thread is in flight.
///
/// **Interaction**: Owned by the turn controller via `Arc`; the CLI reads
/// snapshots from it after each turn.
pub struct ConversationStore {
    checkpointer: Arc<dyn Checkpointer<Conversation>>,
    locks: ThreadLocks,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl ConversationStore {
    pub fn new(checkpointer: Arc<dyn Checkpointer<Conversation>>) -> Self {
        Self {
            checkpointer,
            locks: ThreadLocks::new(),
        }
    }

    /// Store backed by [`MemorySaver`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemorySaver::new()))
    }

    async fn latest(
        &self,
        thread_id: &str,
    ) -> Result<Option<Checkpoint<Conversation>>, CheckpointError> {
        let found = self
            .checkpointer
            .get_tuple(&RunnableConfig::for_thread(thread_id))
            .await?;
        Ok(found.map(|(cp, _)| cp))
    }

    /// Appends `message` and writes a checkpoint; returns the updated conversation.
    ///
    /// Human messages are recorded with source `input`, everything else `loop`.
    pub async fn append(
        &self,
        thread_id: &str,
        message: Message,
    ) -> Result<Conversation, CheckpointError> {
        let _guard = self.locks.lock(thread_id).await;

        let parent = self.latest(thread_id).await?;
        let mut conversation = parent
            .as_ref()
            .map(|cp| cp.channel_values.clone())
            .unwrap_or_else(|| Conversation::new(thread_id));
        let source = match message {
            Message::Human { .. } => CheckpointSource::Input,
            _ => CheckpointSource::Loop,
        };
        let writes = serde_json::to_value(&message)
            .map_err(|e| CheckpointError::Serialization(e.to_string()))?;
        conversation.push(message);

        let checkpoint =
            Checkpoint::from_state(conversation, source, parent.as_ref(), Some(writes));
        self.checkpointer
            .put(&RunnableConfig::for_thread(thread_id), &checkpoint)
            .await?;
        debug!(
            thread_id = %thread_id,
            checkpoint_id = %checkpoint.id,
            step = checkpoint.metadata.step,
            source = checkpoint.metadata.source.as_str(),
            "checkpoint written"
        );
        Ok(checkpoint.channel_values)
    }

    /// Current conversation; empty for an unknown thread.
    pub async fn get(&self, thread_id: &str) -> Result<Conversation, CheckpointError> {
        Ok(self
            .latest(thread_id)
            .await?
            .map(|cp| cp.channel_values)
            .unwrap_or_else(|| Conversation::new(thread_id)))
    }

    /// Latest snapshot; an empty snapshot (step -1) for an unknown thread.
    pub async fn snapshot(&self, thread_id: &str) -> Result<StateSnapshot, CheckpointError> {
        Ok(match self.latest(thread_id).await? {
            Some(cp) => StateSnapshot::from_checkpoint(thread_id, cp),
            None => StateSnapshot::empty(thread_id),
        })
    }

    /// Snapshot at a specific checkpoint of the thread.
    pub async fn snapshot_at(
        &self,
        thread_id: &str,
        checkpoint_id: &str,
    ) -> Result<StateSnapshot, CheckpointError> {
        let config = RunnableConfig::for_thread(thread_id).with_checkpoint(checkpoint_id);
        match self.checkpointer.get_tuple(&config).await? {
            Some((cp, _)) => Ok(StateSnapshot::from_checkpoint(thread_id, cp)),
            None => Err(CheckpointError::NotFound(format!(
                "thread {} checkpoint {}",
                thread_id, checkpoint_id
            ))),
        }
    }

    /// Snapshots of the thread, newest first, at most `limit` when given.
    pub async fn history(
        &self,
        thread_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<StateSnapshot>, CheckpointError> {
        let items = self
            .checkpointer
            .list(&RunnableConfig::for_thread(thread_id), limit, None)
            .await?;
        let mut out = Vec::with_capacity(items.len());
        for item in items.iter().rev() {
            out.push(self.snapshot_at(thread_id, &item.checkpoint_id).await?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{NEXT_MODEL, NEXT_TOOLS};
    use crate::ToolCall;

    #[tokio::test]
    async fn unknown_thread_is_empty_not_error() {
        let store = ConversationStore::in_memory();
        let conv = store.get("nobody").await.unwrap();
        assert!(conv.is_empty());
        assert_eq!(conv.thread_id, "nobody");
        let snap = store.snapshot("nobody").await.unwrap();
        assert_eq!(snap.step(), -1);
        assert!(snap.checkpoint_id().is_none());
        assert!(snap.parent_config.is_none());
        assert!(snap.next.is_empty());
    }

    #[tokio::test]
    async fn append_links_checkpoints_and_derives_next() {
        let store = ConversationStore::in_memory();
        store.append("t", Message::human("hi")).await.unwrap();
        let first = store.snapshot("t").await.unwrap();
        assert_eq!(first.step(), 0);
        assert_eq!(first.next, vec![NEXT_MODEL.to_string()]);
        assert_eq!(
            first.metadata.as_ref().unwrap().source,
            CheckpointSource::Input
        );

        let call = ToolCall {
            id: "c1".into(),
            name: "search".into(),
            arguments: "{}".into(),
        };
        store
            .append("t", Message::ai_with_tool_calls("", vec![call], None))
            .await
            .unwrap();
        let second = store.snapshot("t").await.unwrap();
        assert_eq!(second.step(), 1);
        assert_eq!(second.next, vec![NEXT_TOOLS.to_string()]);
        assert_eq!(
            second.parent_config.as_ref().unwrap().checkpoint_id,
            first.config.checkpoint_id
        );
        assert_eq!(
            second.metadata.as_ref().unwrap().source,
            CheckpointSource::Loop
        );
        assert_eq!(
            second.metadata.as_ref().unwrap().writes.as_ref().unwrap()["role"],
            "ai"
        );
    }

    #[tokio::test]
    async fn snapshot_at_is_stable_and_history_is_newest_first() {
        let store = ConversationStore::in_memory();
        store.append("t", Message::human("one")).await.unwrap();
        store.append("t", Message::ai("two")).await.unwrap();
        store.append("t", Message::human("three")).await.unwrap();

        let history = store.history("t", None).await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].values.len(), 3);
        assert_eq!(history[2].values.len(), 1);

        let id = history[1].checkpoint_id().unwrap().to_string();
        let a = store.snapshot_at("t", &id).await.unwrap();
        let b = store.snapshot_at("t", &id).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.values.last().unwrap().content(), "two");

        assert_eq!(store.history("t", Some(1)).await.unwrap().len(), 1);
        let err = store.snapshot_at("t", "missing").await.unwrap_err();
        assert!(matches!(err, CheckpointError::NotFound(_)));
    }

    #[tokio::test]
    async fn threads_do_not_mix() {
        let store = ConversationStore::in_memory();
        store.append("a", Message::human("for a")).await.unwrap();
        store.append("b", Message::human("for b")).await.unwrap();
        assert_eq!(store.get("a").await.unwrap().len(), 1);
        assert_eq!(
            store.get("b").await.unwrap().last().unwrap().content(),
            "for b"
        );
    }

    #[tokio::test]
    async fn lock_entries_do_not_outlive_appends() {
        let store = ConversationStore::in_memory();
        for i in 0..50 {
            store
                .append(&format!("thread-{}", i), Message::human("hi"))
                .await
                .unwrap();
        }
        assert_eq!(store.locks.len(), 0);
    }
}
