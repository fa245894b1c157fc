//! Mock tool source for tests: one tool with a fixed reply or a scripted failure.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::tool_source::{ToolCallContent, ToolSource, ToolSourceError, ToolSpec};

enum Behavior {
    Reply(String),
    Fail(String),
    Sleep(Duration),
}

/// Mock ToolSource exposing a single tool.
pub struct MockToolSource {
    name: String,
    behavior: Behavior,
    calls: Mutex<Vec<(String, Value)>>,
}

impl MockToolSource {
    /// Tool `name` that always returns `text`.
    pub fn replying(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::with_behavior(name, Behavior::Reply(text.into()))
    }

    /// Tool `name` that always fails with a transport error.
    pub fn failing(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self::with_behavior(name, Behavior::Fail(error.into()))
    }

    /// Tool `name` that sleeps for `delay` before replying (timeout tests).
    pub fn sleeping(name: impl Into<String>, delay: Duration) -> Self {
        Self::with_behavior(name, Behavior::Sleep(delay))
    }

    fn with_behavior(name: impl Into<String>, behavior: Behavior) -> Self {
        Self {
            name: name.into(),
            behavior,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Calls received so far as (name, arguments).
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ToolSource for MockToolSource {
    async fn list_tools(&self) -> Result<Vec<ToolSpec>, ToolSourceError> {
        Ok(vec![ToolSpec {
            name: self.name.clone(),
            description: Some("Mock tool for tests.".to_string()),
            input_schema: serde_json::json!({ "type": "object", "properties": {} }),
        }])
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
    ) -> Result<ToolCallContent, ToolSourceError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((name.to_string(), arguments));
        }
        if name != self.name {
            return Err(ToolSourceError::NotFound(name.to_string()));
        }
        match &self.behavior {
            Behavior::Reply(text) => Ok(ToolCallContent { text: text.clone() }),
            Behavior::Fail(error) => Err(ToolSourceError::Transport(error.clone())),
            Behavior::Sleep(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(ToolCallContent {
                    text: "late".to_string(),
                })
            }
        }
    }
}
