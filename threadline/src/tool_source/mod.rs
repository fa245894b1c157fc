//! Tool source abstraction: list tools and call a tool.
//!
//! The turn controller depends on `ToolSource` instead of a concrete registry;
//! implementations are [`ToolRegistry`](crate::tools::ToolRegistry) (aggregates
//! [`Tool`](crate::tools::Tool)s such as the Tavily search tool) and
//! [`MockToolSource`] for tests.

mod mock;

pub use mock::MockToolSource;

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Tool specification sent to the model (function name, description, JSON schema).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ToolSpec {
    pub name: String,
    /// Human-readable description for the LLM.
    pub description: Option<String>,
    /// JSON Schema for arguments.
    pub input_schema: Value,
}

/// Result of a single tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallContent {
    pub text: String,
}

/// Errors from listing or calling tools.
///
/// **Interaction**: The turn controller never propagates these; each becomes an
/// error-bearing tool message the model can react to.
#[derive(Debug, Error)]
pub enum ToolSourceError {
    #[error("tool not found: {0}")]
    NotFound(String),
    #[error("invalid arguments: {0}")]
    InvalidInput(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("tool call timed out after {0:?}")]
    Timeout(Duration),
}

/// Tool source: list tools and call a tool.
#[async_trait]
pub trait ToolSource: Send + Sync {
    /// List available tools; bound to the model at construction.
    async fn list_tools(&self) -> Result<Vec<ToolSpec>, ToolSourceError>;

    /// Call a tool by name with JSON arguments.
    async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
    ) -> Result<ToolCallContent, ToolSourceError>;
}
