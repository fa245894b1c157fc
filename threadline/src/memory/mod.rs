//! Conversation persistence: checkpoints, checkpointers and the per-thread store.
//!
//! - [`Checkpoint`] / [`CheckpointMetadata`]: one saved state with source, step,
//!   parent and the write that produced it.
//! - [`Checkpointer`]: swap point; [`MemorySaver`] (default) and [`SqliteSaver`].
//! - [`ConversationStore`]: `append` / `get` / `snapshot` / `snapshot_at` / `history`.

mod checkpoint;
mod checkpointer;
mod config;
mod memory_saver;
mod serializer;
mod sqlite_saver;
mod store;
mod thread_locks;

pub use checkpoint::{Checkpoint, CheckpointListItem, CheckpointMetadata, CheckpointSource};
pub use checkpointer::{CheckpointError, Checkpointer};
pub use config::RunnableConfig;
pub use memory_saver::MemorySaver;
pub use serializer::{JsonSerializer, Serializer};
pub use sqlite_saver::SqliteSaver;
pub use store::{ConversationStore, StateSnapshot};
pub(crate) use thread_locks::ThreadLocks;
