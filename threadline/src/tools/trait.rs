use async_trait::async_trait;

use crate::tool_source::{ToolCallContent, ToolSourceError, ToolSpec};

/// A single tool the model can call: name, input schema, and invoke.
///
/// Tools are registered with [`ToolRegistry`](super::ToolRegistry), which exposes
/// them to the turn controller as a `ToolSource`.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use serde_json::Value;
/// use threadline::tools::Tool;
/// use threadline::tool_source::{ToolCallContent, ToolSourceError, ToolSpec};
///
/// struct Echo;
///
/// #[async_trait]
/// impl Tool for Echo {
///     fn name(&self) -> &str {
///         "echo"
///     }
///
///     fn spec(&self) -> ToolSpec {
///         ToolSpec {
///             name: "echo".to_string(),
///             description: Some("Echo the arguments back".to_string()),
///             input_schema: serde_json::json!({ "type": "object" }),
///         }
///     }
///
///     async fn call(&self, args: Value) -> Result<ToolCallContent, ToolSourceError> {
///         Ok(ToolCallContent { text: args.to_string() })
///     }
/// }
/// ```
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name; the model refers to the tool by it.
    fn name(&self) -> &str;

    /// Description and JSON schema sent to the model.
    fn spec(&self) -> ToolSpec;

    /// Executes the tool with already-parsed JSON arguments.
    async fn call(&self, args: serde_json::Value) -> Result<ToolCallContent, ToolSourceError>;
}
