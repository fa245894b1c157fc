//! Turn-level error type.
//!
//! Tool failures never appear here; the turn controller turns them into
//! error-bearing tool messages.

use thiserror::Error;

use crate::llm::LlmError;
use crate::memory::CheckpointError;

/// Error that ends a turn. Every variant names the thread.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The model call failed; `step` is the 1-based model call within the turn.
    #[error("thread {thread_id}: model invocation failed at step {step}: {source}")]
    ModelInvocation {
        thread_id: String,
        step: usize,
        source: LlmError,
    },

    /// Reading or writing the conversation checkpoint failed.
    #[error("thread {thread_id}: checkpoint error: {source}")]
    Checkpoint {
        thread_id: String,
        source: CheckpointError,
    },

    /// The model kept requesting tools past the per-turn call limit.
    #[error("thread {thread_id}: recursion limit of {limit} model calls reached without a final answer")]
    RecursionLimit { thread_id: String, limit: usize },

    /// `resume` found no pending model or tool step on the thread.
    #[error("thread {thread_id}: nothing to resume")]
    NothingToResume { thread_id: String },
}

impl AgentError {
    pub fn thread_id(&self) -> &str {
        match self {
            Self::ModelInvocation { thread_id, .. }
            | Self::Checkpoint { thread_id, .. }
            | Self::RecursionLimit { thread_id, .. }
            | Self::NothingToResume { thread_id } => thread_id,
        }
    }

    /// True when the model call hit its timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::ModelInvocation {
                source: LlmError::Timeout(_),
                ..
            }
        )
    }
}
