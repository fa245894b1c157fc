//! Tool execution for one `ToolRequest`: parse arguments, call with timeout,
//! turn every failure into an error tool message.

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::message::Message;
use crate::state::ToolCall;
use crate::tool_source::{ToolSource, ToolSourceError};

/// Text of an error tool message; `{error}` is replaced by the failure.
pub const TOOL_ERROR_TEMPLATE: &str = "Error: {error}\n Please fix your mistakes.";

fn truncate_for_log(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(max_len).collect::<String>())
    }
}

/// Parses `ToolCall.arguments` into JSON. Blank means `{}`; a JSON string holding
/// JSON (double-encoded arguments) is decoded once more.
pub(crate) fn parse_tool_arguments(arguments: &str) -> Result<Value, ToolSourceError> {
    if arguments.trim().is_empty() {
        return Ok(serde_json::json!({}));
    }
    let raw: Value = serde_json::from_str(arguments)
        .map_err(|e| ToolSourceError::InvalidInput(format!("arguments are not JSON: {}", e)))?;
    match raw.as_str() {
        Some(s) => Ok(serde_json::from_str(s).unwrap_or(raw)),
        None => Ok(raw),
    }
}

pub(crate) fn format_tool_error(error: &ToolSourceError) -> String {
    TOOL_ERROR_TEMPLATE.replace("{error}", &error.to_string())
}

/// Runs one tool call to completion and returns the tool message to append.
pub(crate) async fn execute_tool_call(
    tools: &dyn ToolSource,
    call: &ToolCall,
    timeout: Duration,
) -> Message {
    let result = match parse_tool_arguments(&call.arguments) {
        Ok(args) => {
            debug!(tool = %call.name, call_id = %call.id, args = %args, "calling tool");
            match tokio::time::timeout(timeout, tools.call_tool(&call.name, args)).await {
                Ok(r) => r,
                Err(_) => Err(ToolSourceError::Timeout(timeout)),
            }
        }
        Err(e) => Err(e),
    };
    match result {
        Ok(content) => {
            trace!(
                tool = %call.name,
                result_len = content.text.len(),
                result_preview = %truncate_for_log(&content.text, 200),
                "tool returned"
            );
            Message::tool_result(call, content.text)
        }
        Err(e) => {
            warn!(tool = %call.name, call_id = %call.id, error = %e, "tool call failed");
            Message::tool_error(call, format_tool_error(&e))
        }
    }
}
