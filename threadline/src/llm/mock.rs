//! Mock LLM for tests and offline runs.
//!
//! Returns scripted responses in order; once the script is exhausted the last
//! response is repeated. Records every message list it receives so tests can
//! assert on what the model saw.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{LlmClient, LlmError, LlmResponse};
use crate::message::Message;
use crate::state::ToolCall;

/// Scripted LLM.
///
/// **Interaction**: Implements `LlmClient`; injected into `TurnController` in tests.
pub struct MockLlm {
    script: Vec<Result<LlmResponse, String>>,
    calls: Mutex<Vec<Vec<Message>>>,
}

impl MockLlm {
    /// Creates a mock that replays `responses` in order.
    pub fn scripted(responses: Vec<LlmResponse>) -> Self {
        Self {
            script: responses.into_iter().map(Ok).collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Creates a mock that always answers `content` without tool calls.
    pub fn with_no_tool_calls(content: impl Into<String>) -> Self {
        Self::scripted(vec![LlmResponse::FinalAnswer {
            content: content.into(),
            usage: None,
        }])
    }

    /// First call requests one `name` tool call with `arguments`; second call answers `final_content`.
    pub fn with_tool_call_then_answer(
        name: impl Into<String>,
        arguments: impl Into<String>,
        final_content: impl Into<String>,
    ) -> Self {
        Self::scripted(vec![
            LlmResponse::ToolRequest {
                content: String::new(),
                tool_calls: vec![ToolCall {
                    id: "call-1".to_string(),
                    name: name.into(),
                    arguments: arguments.into(),
                }],
                usage: None,
            },
            LlmResponse::FinalAnswer {
                content: final_content.into(),
                usage: None,
            },
        ])
    }

    /// Creates a mock whose every call fails with an API error.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            script: vec![Err(message.into())],
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Number of invocations so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }

    /// Message lists received so far, one entry per invocation.
    pub fn received(&self) -> Vec<Vec<Message>> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn invoke(&self, messages: &[Message]) -> Result<LlmResponse, LlmError> {
        let index = {
            let mut calls = self
                .calls
                .lock()
                .map_err(|e| LlmError::Api(format!("mock lock poisoned: {}", e)))?;
            calls.push(messages.to_vec());
            calls.len() - 1
        };
        let entry = self
            .script
            .get(index)
            .or_else(|| self.script.last())
            .ok_or(LlmError::NoChoices)?;
        entry.clone().map_err(LlmError::Api)
    }
}
