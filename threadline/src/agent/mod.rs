//! Turn controller: runs one human turn to completion.
//!
//! States: `AwaitingModel` → (`AwaitingTool` → `AwaitingModel`)* → `Done`.
//! Each model response and tool result is appended to the
//! [`ConversationStore`](crate::memory::ConversationStore) as it arrives.
//!
//! Tool failures (unknown tool, malformed arguments, tool error, timeout) become
//! error tool messages using [`TOOL_ERROR_TEMPLATE`] and the turn continues.
//! Model failures end the turn with [`AgentError::ModelInvocation`](crate::AgentError).

mod act;
mod controller;

pub use act::TOOL_ERROR_TEMPLATE;
pub use controller::{
    TurnController, TurnEvent, TurnOptions, TurnOutcome, TurnState, DEFAULT_MAX_MODEL_CALLS,
    DEFAULT_MODEL_TIMEOUT, DEFAULT_TOOL_TIMEOUT,
};
