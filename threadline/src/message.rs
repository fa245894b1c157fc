//! Message types for the conversation log.
//!
//! Roles: System (model input only, never stored), Human, Ai, Tool.
//! Every message carries a unique id and is immutable once appended to a
//! [`Conversation`](crate::state::Conversation).

use serde::{Deserialize, Serialize};

use crate::llm::LlmUsage;
use crate::state::ToolCall;

fn new_message_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// A single message in the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    /// System prompt; prepended to model input by the turn controller.
    System { id: String, content: String },
    /// User input.
    Human { id: String, content: String },
    /// Model reply. Non-empty `tool_calls` means the model asked for tools.
    Ai {
        id: String,
        content: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        usage: Option<LlmUsage>,
    },
    /// Result of one tool call, linked to the request by `tool_call_id`.
    Tool {
        id: String,
        tool_call_id: String,
        name: String,
        content: String,
        #[serde(default)]
        is_error: bool,
    },
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self::System {
            id: new_message_id(),
            content: content.into(),
        }
    }

    pub fn human(content: impl Into<String>) -> Self {
        Self::Human {
            id: new_message_id(),
            content: content.into(),
        }
    }

    /// Creates an AI message without tool calls.
    pub fn ai(content: impl Into<String>) -> Self {
        Self::ai_with_tool_calls(content, Vec::new(), None)
    }

    pub fn ai_with_tool_calls(
        content: impl Into<String>,
        tool_calls: Vec<ToolCall>,
        usage: Option<LlmUsage>,
    ) -> Self {
        Self::Ai {
            id: new_message_id(),
            content: content.into(),
            tool_calls,
            usage,
        }
    }

    /// Creates a successful tool result for `call`.
    pub fn tool_result(call: &ToolCall, content: impl Into<String>) -> Self {
        Self::Tool {
            id: new_message_id(),
            tool_call_id: call.id.clone(),
            name: call.name.clone(),
            content: content.into(),
            is_error: false,
        }
    }

    /// Creates an error-bearing tool result for `call`; the model sees `content` as the result.
    pub fn tool_error(call: &ToolCall, content: impl Into<String>) -> Self {
        Self::Tool {
            id: new_message_id(),
            tool_call_id: call.id.clone(),
            name: call.name.clone(),
            content: content.into(),
            is_error: true,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::System { id, .. }
            | Self::Human { id, .. }
            | Self::Ai { id, .. }
            | Self::Tool { id, .. } => id,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            Self::System { content, .. }
            | Self::Human { content, .. }
            | Self::Ai { content, .. }
            | Self::Tool { content, .. } => content,
        }
    }

    /// Short role label ("system", "human", "ai", "tool").
    pub fn role(&self) -> &'static str {
        match self {
            Self::System { .. } => "system",
            Self::Human { .. } => "human",
            Self::Ai { .. } => "ai",
            Self::Tool { .. } => "tool",
        }
    }

    /// Tool calls requested by an AI message; empty for every other role.
    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            Self::Ai { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }

    pub fn is_ai(&self) -> bool {
        matches!(self, Self::Ai { .. })
    }
}
