//! Conversation state and tool-call types.
//!
//! # Main types
//!
//! - [`Conversation`]: ordered, append-only message log for one thread id.
//! - [`ToolCall`]: a single tool invocation requested by the model; the turn
//!   controller executes it and appends a tool message with the same `id`.
//!
//! # Example
//!
//! ```rust
//! use threadline::{Conversation, Message};
//!
//! let mut conversation = Conversation::new("1");
//! conversation.push(Message::human("What is 2+2?"));
//! assert_eq!(conversation.len(), 1);
//! ```

mod conversation;

pub use conversation::{Conversation, ToolCall, NEXT_MODEL, NEXT_TOOLS};
