//! OpenAI-compatible Chat Completions client implementing `LlmClient` (ChatOpenAI).
//!
//! Works against any endpoint speaking the Chat Completions protocol (OpenAI,
//! Ollama's `/v1`, vLLM, ...). Base URL, API key and model come from
//! [`OpenAIConfig`]. Tools bound with [`ChatOpenAI::with_tools`] are sent on every
//! request; the response is mapped to [`LlmResponse::ToolRequest`] when it
//! carries `tool_calls`, else [`LlmResponse::FinalAnswer`].
//!
//! The whole message log is sent, including assistant tool calls and tool
//! results, so the model sees prior tool output on the next round.

use async_trait::async_trait;
use tracing::{debug, trace};

use crate::llm::{LlmClient, LlmError, LlmResponse, LlmUsage};
use crate::message::Message;
use crate::state::ToolCall;
use crate::tool_source::ToolSpec;

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionMessageToolCall, ChatCompletionMessageToolCalls,
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessage, ChatCompletionRequestToolMessageArgs,
        ChatCompletionRequestUserMessage, ChatCompletionTool, ChatCompletionTools,
        CreateChatCompletionRequest, CreateChatCompletionRequestArgs, FunctionCall,
        FunctionObject,
    },
    Client,
};

/// OpenAI-compatible chat client implementing `LlmClient`.
///
/// **Interaction**: Injected into `TurnController` as `Arc<dyn LlmClient>`.
pub struct ChatOpenAI {
    client: Client<OpenAIConfig>,
    model: String,
    tools: Option<Vec<ToolSpec>>,
}

impl ChatOpenAI {
    /// Build client with custom config (API key, base URL).
    pub fn with_config(config: OpenAIConfig, model: impl Into<String>) -> Self {
        Self {
            client: Client::with_config(config),
            model: model.into(),
            tools: None,
        }
    }

    /// Client for an OpenAI-compatible `base_url` (e.g. `http://localhost:11434/v1`).
    /// Without `api_key` the async-openai default (`OPENAI_API_KEY`, possibly empty) is used.
    pub fn for_endpoint(
        base_url: impl Into<String>,
        api_key: Option<&str>,
        model: impl Into<String>,
    ) -> Self {
        let mut config = OpenAIConfig::new().with_api_base(base_url);
        if let Some(key) = api_key {
            config = config.with_api_key(key);
        }
        Self::with_config(config, model)
    }

    /// Set tools for this completion (enables tool_calls in response).
    pub fn with_tools(mut self, tools: Vec<ToolSpec>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn messages_to_request(
        messages: &[Message],
    ) -> Result<Vec<ChatCompletionRequestMessage>, LlmError> {
        messages.iter().map(Self::message_to_request).collect()
    }

    fn message_to_request(message: &Message) -> Result<ChatCompletionRequestMessage, LlmError> {
        let built = match message {
            Message::System { content, .. } => ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessage::from(content.as_str()),
            ),
            Message::Human { content, .. } => ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessage::from(content.as_str()),
            ),
            Message::Ai {
                content,
                tool_calls,
                ..
            } => {
                let mut args = ChatCompletionRequestAssistantMessageArgs::default();
                if !content.is_empty() || tool_calls.is_empty() {
                    args.content(content.as_str());
                }
                if !tool_calls.is_empty() {
                    args.tool_calls(
                        tool_calls
                            .iter()
                            .map(|tc| {
                                ChatCompletionMessageToolCalls::Function(
                                    ChatCompletionMessageToolCall {
                                        id: tc.id.clone(),
                                        function: FunctionCall {
                                            name: tc.name.clone(),
                                            arguments: tc.arguments.clone(),
                                        },
                                    },
                                )
                            })
                            .collect::<Vec<_>>(),
                    );
                }
                ChatCompletionRequestMessage::Assistant(
                    args.build().map_err(|e| LlmError::Request(e.to_string()))?,
                )
            }
            Message::Tool {
                tool_call_id,
                content,
                ..
            } => ChatCompletionRequestMessage::Tool(
                ChatCompletionRequestToolMessageArgs::default()
                    .tool_call_id(tool_call_id.as_str())
                    .content(content.as_str())
                    .build()
                    .map_err(|e| LlmError::Request(e.to_string()))?,
            ),
        };
        Ok(built)
    }

    fn build_request(&self, messages: &[Message]) -> Result<CreateChatCompletionRequest, LlmError> {
        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(self.model.clone());
        args.messages(Self::messages_to_request(messages)?);
        if let Some(tools) = self.tools.as_deref().filter(|t| !t.is_empty()) {
            args.tools(Self::chat_tools(tools));
        }
        args.build().map_err(|e| LlmError::Request(e.to_string()))
    }

    fn chat_tools(tools: &[ToolSpec]) -> Vec<ChatCompletionTools> {
        tools
            .iter()
            .map(|t| {
                ChatCompletionTools::Function(ChatCompletionTool {
                    function: FunctionObject {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        parameters: Some(t.input_schema.clone()),
                        ..Default::default()
                    },
                })
            })
            .collect()
    }
}

#[async_trait]
impl LlmClient for ChatOpenAI {
    async fn invoke(&self, messages: &[Message]) -> Result<LlmResponse, LlmError> {
        let trace_id = uuid::Uuid::now_v7().to_string();
        let request = self.build_request(messages)?;

        debug!(
            trace_id = %trace_id,
            model = %self.model,
            message_count = messages.len(),
            tools_count = self.tools.as_ref().map(|t| t.len()).unwrap_or(0),
            "chat completion request"
        );
        if let Ok(js) = serde_json::to_string_pretty(&request) {
            trace!(trace_id = %trace_id, request = %js, "chat completion request body");
        }

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| LlmError::Api(e.to_string()))?;

        if let Ok(js) = serde_json::to_string_pretty(&response) {
            trace!(trace_id = %trace_id, response = %js, "chat completion response body");
        }

        let usage = response.usage.map(|u| LlmUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or(LlmError::NoChoices)?;

        let msg = choice.message;
        let content = msg.content.unwrap_or_default();
        let tool_calls: Vec<ToolCall> = msg
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .filter_map(|tc| {
                if let ChatCompletionMessageToolCalls::Function(f) = tc {
                    Some(ToolCall {
                        id: f.id,
                        name: f.function.name,
                        arguments: f.function.arguments,
                    })
                } else {
                    None
                }
            })
            .collect();

        debug!(
            trace_id = %trace_id,
            content_len = content.len(),
            tool_calls = tool_calls.len(),
            total_tokens = usage.as_ref().map(|u| u.total_tokens),
            "chat completion response"
        );
        Ok(LlmResponse::from_parts(content, tool_calls, usage))
    }
}
