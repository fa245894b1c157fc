//! Conversation log and tool-call types.
//!
//! `Conversation` is the state the checkpointer stores: the thread id plus the
//! message list. `ToolCall` aligns with the OpenAI `tool_calls` item
//! (id, function name, JSON-encoded arguments).

use serde::{Deserialize, Serialize};

use crate::message::Message;

/// Pending action name when the model should run next.
pub const NEXT_MODEL: &str = "model";
/// Pending action name when requested tools have not produced results yet.
pub const NEXT_TOOLS: &str = "tools";

/// A single tool invocation produced by the model.
///
/// **Interaction**: Carried by `Message::Ai::tool_calls`; executed by the turn
/// controller via `ToolSource::call_tool(name, arguments)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Id used to correlate the tool result message.
    pub id: String,
    /// Tool name as registered in the ToolSource.
    pub name: String,
    /// Arguments as a JSON string; parsed when the tool is called.
    pub arguments: String,
}

/// Ordered, append-only message log for a single thread.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub thread_id: String,
    pub messages: Vec<Message>,
}

impl Conversation {
    pub fn new(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            messages: Vec::new(),
        }
    }

    /// Appends a message. There is no API to remove or edit messages.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Content of the chronologically last AI message, if any.
    pub fn last_ai_reply(&self) -> Option<&str> {
        self.messages.iter().rev().find_map(|m| match m {
            Message::Ai { content, .. } => Some(content.as_str()),
            _ => None,
        })
    }

    /// Tool calls of the last AI message that have no result message yet.
    pub fn pending_tool_calls(&self) -> Vec<ToolCall> {
        let Some(pos) = self.messages.iter().rposition(Message::is_ai) else {
            return Vec::new();
        };
        let answered: Vec<&str> = self.messages[pos + 1..]
            .iter()
            .filter_map(|m| match m {
                Message::Tool { tool_call_id, .. } => Some(tool_call_id.as_str()),
                _ => None,
            })
            .collect();
        self.messages[pos]
            .tool_calls()
            .iter()
            .filter(|tc| !answered.contains(&tc.id.as_str()))
            .cloned()
            .collect()
    }

    /// Actions that would run next if the controller resumed from this state.
    ///
    /// Empty when the last message is a final AI reply (or the log is empty).
    pub fn next_actions(&self) -> Vec<String> {
        match self.messages.last() {
            None => Vec::new(),
            Some(Message::Ai { .. }) => {
                if self.pending_tool_calls().is_empty() {
                    Vec::new()
                } else {
                    vec![NEXT_TOOLS.to_string()]
                }
            }
            Some(Message::Tool { .. }) => {
                if self.pending_tool_calls().is_empty() {
                    vec![NEXT_MODEL.to_string()]
                } else {
                    vec![NEXT_TOOLS.to_string()]
                }
            }
            Some(_) => vec![NEXT_MODEL.to_string()],
        }
    }
}
