//! # Threadline
//!
//! A tool-calling chat agent whose conversations are checkpointed per thread id.
//! Two cooperating pieces do the work: a [`ConversationStore`] (append-only
//! message log per thread, one checkpoint per append) and a [`TurnController`]
//! (model → tools → model until the model answers without tool calls).
//!
//! ## Main modules
//!
//! - [`message`]: [`Message`] (System / Human / Ai / Tool).
//! - [`state`]: [`Conversation`], [`ToolCall`]; `next` actions derived from the tail.
//! - [`memory`]: [`Checkpointer`] with [`MemorySaver`] and [`SqliteSaver`];
//!   [`ConversationStore`] and [`StateSnapshot`].
//! - [`llm`]: [`LlmClient`], [`LlmResponse`]; [`ChatOpenAI`] and [`MockLlm`].
//! - [`tool_source`]: [`ToolSource`], [`ToolSpec`], [`ToolSourceError`]; [`MockToolSource`].
//! - [`tools`]: [`Tool`], [`ToolRegistry`], [`TavilySearchTool`].
//! - [`agent`]: [`TurnController`], [`TurnOptions`], [`TurnEvent`], [`TurnState`].
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use threadline::{ConversationStore, MockLlm, MockToolSource, TurnController};
//!
//! # async fn demo() -> Result<(), threadline::AgentError> {
//! let controller = TurnController::new(
//!     Arc::new(MockLlm::with_no_tool_calls("Hello!")),
//!     Arc::new(MockToolSource::replying("tavily_search_results_json", "[]")),
//!     Arc::new(ConversationStore::in_memory()),
//! );
//! let outcome = controller.run_turn("1", "Hi there!").await?;
//! assert_eq!(outcome.reply(), "Hello!");
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod error;
pub mod llm;
pub mod memory;
pub mod message;
pub mod state;
pub mod tool_source;
pub mod tools;

pub use agent::{
    TurnController, TurnEvent, TurnOptions, TurnOutcome, TurnState, TOOL_ERROR_TEMPLATE,
};
pub use error::AgentError;
pub use llm::{ChatOpenAI, LlmClient, LlmError, LlmResponse, LlmUsage, MockLlm};
pub use memory::{
    Checkpoint, CheckpointError, CheckpointMetadata, CheckpointSource, Checkpointer,
    ConversationStore, JsonSerializer, MemorySaver, RunnableConfig, SqliteSaver, StateSnapshot,
};
pub use message::Message;
pub use state::{Conversation, ToolCall};
pub use tool_source::{MockToolSource, ToolCallContent, ToolSource, ToolSourceError, ToolSpec};
pub use tools::{TavilySearchTool, Tool, ToolRegistry};

#[cfg(test)]
mod test_logging {
    use ctor::ctor;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::Layer;

    #[ctor]
    fn init() {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_test_writer()
                    .with_filter(filter),
            )
            .try_init();
    }
}
