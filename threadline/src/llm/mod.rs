//! LLM client abstraction for the turn controller.
//!
//! The controller depends on a callable that, given the message log, returns
//! either a final answer or a list of tool-call requests. This module defines
//! the trait, the tagged response, and two implementations: [`ChatOpenAI`]
//! (OpenAI-compatible HTTP API) and [`MockLlm`] (scripted, for tests).

mod mock;
mod openai;

pub use mock::MockLlm;
pub use openai::ChatOpenAI;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::message::Message;
use crate::state::ToolCall;

/// Errors from a single model invocation. Fatal to the turn.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The request could not be built (bad arguments, unserializable tools).
    #[error("request build failed: {0}")]
    Request(String),
    /// Network or API failure reported by the endpoint.
    #[error("model API error: {0}")]
    Api(String),
    /// The endpoint answered without any choice.
    #[error("model returned no choices")]
    NoChoices,
    /// The call did not complete within the configured timeout.
    #[error("model call timed out after {0:?}")]
    Timeout(Duration),
}

/// Token usage for one LLM call (prompt + completion).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Response from one model invocation.
///
/// The turn controller branches on the variant: `ToolRequest` leads to tool
/// execution, `FinalAnswer` ends the turn.
#[derive(Clone, Debug, PartialEq)]
pub enum LlmResponse {
    FinalAnswer {
        content: String,
        usage: Option<LlmUsage>,
    },
    ToolRequest {
        /// Text emitted alongside the calls; often empty.
        content: String,
        tool_calls: Vec<ToolCall>,
        usage: Option<LlmUsage>,
    },
}

impl LlmResponse {
    /// Builds the variant from raw parts: no tool calls means a final answer.
    pub fn from_parts(content: String, tool_calls: Vec<ToolCall>, usage: Option<LlmUsage>) -> Self {
        if tool_calls.is_empty() {
            Self::FinalAnswer { content, usage }
        } else {
            Self::ToolRequest {
                content,
                tool_calls,
                usage,
            }
        }
    }

    pub fn content(&self) -> &str {
        match self {
            Self::FinalAnswer { content, .. } | Self::ToolRequest { content, .. } => content,
        }
    }

    pub fn usage(&self) -> Option<&LlmUsage> {
        match self {
            Self::FinalAnswer { usage, .. } | Self::ToolRequest { usage, .. } => usage.as_ref(),
        }
    }

    /// Converts the response into the AI message appended to the conversation.
    pub fn into_message(self) -> Message {
        match self {
            Self::FinalAnswer { content, usage } => {
                Message::ai_with_tool_calls(content, Vec::new(), usage)
            }
            Self::ToolRequest {
                content,
                tool_calls,
                usage,
            } => Message::ai_with_tool_calls(content, tool_calls, usage),
        }
    }
}

/// LLM client: given the message log, returns a final answer or tool requests.
///
/// Tools are bound at construction (e.g. `ChatOpenAI::with_tools`), so the
/// controller only passes messages.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn invoke(&self, messages: &[Message]) -> Result<LlmResponse, LlmError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_parts_picks_variant_by_tool_calls() {
        let r = LlmResponse::from_parts("hi".into(), vec![], None);
        assert!(matches!(r, LlmResponse::FinalAnswer { .. }));

        let r = LlmResponse::from_parts(
            String::new(),
            vec![ToolCall {
                id: "c1".into(),
                name: "search".into(),
                arguments: "{}".into(),
            }],
            Some(LlmUsage {
                prompt_tokens: 3,
                completion_tokens: 2,
                total_tokens: 5,
            }),
        );
        assert!(matches!(r, LlmResponse::ToolRequest { .. }));
        assert_eq!(r.usage().map(|u| u.total_tokens), Some(5));

        let msg = r.into_message();
        assert_eq!(msg.tool_calls().len(), 1);
    }

    #[test]
    fn timeout_error_mentions_duration() {
        let s = LlmError::Timeout(Duration::from_secs(3)).to_string();
        assert!(s.contains("timed out"), "{}", s);
        assert!(s.contains("3s"), "{}", s);
    }
}
