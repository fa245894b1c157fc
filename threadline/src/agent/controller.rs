//! Turn controller: model → tools → model … until a final answer.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, info_span, Instrument};

use crate::agent::act::execute_tool_call;
use crate::error::AgentError;
use crate::llm::{LlmClient, LlmError, LlmResponse};
use crate::memory::{ConversationStore, ThreadLocks};
use crate::message::Message;
use crate::state::Conversation;
use crate::tool_source::ToolSource;

/// Default per-turn cap on model invocations.
pub const DEFAULT_MAX_MODEL_CALLS: usize = 25;
pub const DEFAULT_MODEL_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

/// Controller state within one turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TurnState {
    AwaitingModel,
    AwaitingTool,
    Done,
}

/// Progress of a turn, sent in order to the optional event channel.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnEvent {
    /// A message was appended (the human input included).
    Appended(Message),
    /// The controller moved to a new state.
    State(TurnState),
}

/// Limits and prompt for every turn run by one controller.
#[derive(Debug, Clone)]
pub struct TurnOptions {
    pub model_timeout: Duration,
    pub tool_timeout: Duration,
    pub max_model_calls: usize,
    /// Prepended to model input; never stored in the conversation.
    pub system_prompt: Option<String>,
}

impl Default for TurnOptions {
    fn default() -> Self {
        Self {
            model_timeout: DEFAULT_MODEL_TIMEOUT,
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
            max_model_calls: DEFAULT_MAX_MODEL_CALLS,
            system_prompt: None,
        }
    }
}

/// Result of a completed turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub thread_id: String,
    /// The last appended AI message.
    pub final_message: Message,
    /// Conversation after the turn.
    pub conversation: Conversation,
    pub model_calls: usize,
    pub tool_calls: usize,
}

impl TurnOutcome {
    pub fn reply(&self) -> &str {
        self.final_message.content()
    }
}

/// Drives one turn per human message.
///
/// Turns on the same thread id run one at a time, so a second human message
/// never lands between a tool request and its results. Different threads run
/// concurrently.
///
/// **Interaction**: Holds the model client, the tool source and the store;
/// all three are shared via `Arc`.
pub struct TurnController {
    llm: Arc<dyn LlmClient>,
    tools: Arc<dyn ToolSource>,
    store: Arc<ConversationStore>,
    options: TurnOptions,
    turns: ThreadLocks,
}

/// Sends to the optional channel; a dropped receiver is ignored.
async fn emit(events: Option<&mpsc::Sender<TurnEvent>>, event: TurnEvent) {
    if let Some(tx) = events {
        let _ = tx.send(event).await;
    }
}

impl TurnController {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        tools: Arc<dyn ToolSource>,
        store: Arc<ConversationStore>,
    ) -> Self {
        Self {
            llm,
            tools,
            store,
            options: TurnOptions::default(),
            turns: ThreadLocks::new(),
        }
    }

    pub fn with_options(mut self, options: TurnOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &TurnOptions {
        &self.options
    }

    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.store
    }

    /// Appends `text` as a human message on `thread_id` and runs the turn to `DONE`.
    pub async fn run_turn(&self, thread_id: &str, text: &str) -> Result<TurnOutcome, AgentError> {
        self.run_turn_with_events(thread_id, text, None).await
    }

    /// Like [`run_turn`](Self::run_turn), reporting every append and state change on `events`.
    pub async fn run_turn_with_events(
        &self,
        thread_id: &str,
        text: &str,
        events: Option<mpsc::Sender<TurnEvent>>,
    ) -> Result<TurnOutcome, AgentError> {
        let span = info_span!("turn", thread_id = %thread_id);
        self.drive(thread_id, Some(Message::human(text)), events.as_ref())
            .instrument(span)
            .await
    }

    /// Continues an interrupted turn without new input: runs the tool calls still
    /// unanswered, then the model loop. Fails with `NothingToResume` when the
    /// thread is empty or its last turn finished.
    pub async fn resume(&self, thread_id: &str) -> Result<TurnOutcome, AgentError> {
        self.resume_with_events(thread_id, None).await
    }

    pub async fn resume_with_events(
        &self,
        thread_id: &str,
        events: Option<mpsc::Sender<TurnEvent>>,
    ) -> Result<TurnOutcome, AgentError> {
        let span = info_span!("turn", thread_id = %thread_id, resumed = true);
        self.drive(thread_id, None, events.as_ref())
            .instrument(span)
            .await
    }

    async fn append(
        &self,
        thread_id: &str,
        message: Message,
        events: Option<&mpsc::Sender<TurnEvent>>,
    ) -> Result<Conversation, AgentError> {
        let conversation = self
            .store
            .append(thread_id, message.clone())
            .await
            .map_err(|source| AgentError::Checkpoint {
                thread_id: thread_id.to_string(),
                source,
            })?;
        emit(events, TurnEvent::Appended(message)).await;
        Ok(conversation)
    }

    async fn transition(&self, to: TurnState, events: Option<&mpsc::Sender<TurnEvent>>) {
        debug!(state = ?to, "turn state");
        emit(events, TurnEvent::State(to)).await;
    }

    fn model_input(&self, conversation: &Conversation) -> Vec<Message> {
        let mut input = Vec::with_capacity(conversation.len() + 1);
        if let Some(prompt) = &self.options.system_prompt {
            input.push(Message::system(prompt.clone()));
        }
        input.extend(conversation.messages.iter().cloned());
        input
    }

    async fn invoke_model(
        &self,
        thread_id: &str,
        step: usize,
        conversation: &Conversation,
    ) -> Result<LlmResponse, AgentError> {
        let input = self.model_input(conversation);
        let timeout = self.options.model_timeout;
        let result = match tokio::time::timeout(timeout, self.llm.invoke(&input)).await {
            Ok(r) => r,
            Err(_) => Err(LlmError::Timeout(timeout)),
        };
        result.map_err(|source| AgentError::ModelInvocation {
            thread_id: thread_id.to_string(),
            step,
            source,
        })
    }

    async fn drive(
        &self,
        thread_id: &str,
        human: Option<Message>,
        events: Option<&mpsc::Sender<TurnEvent>>,
    ) -> Result<TurnOutcome, AgentError> {
        let _turn = self.turns.lock(thread_id).await;

        let mut conversation = match human {
            Some(message) => self.append(thread_id, message, events).await?,
            None => {
                let current = self.store.get(thread_id).await.map_err(|source| {
                    AgentError::Checkpoint {
                        thread_id: thread_id.to_string(),
                        source,
                    }
                })?;
                if current.next_actions().is_empty() {
                    return Err(AgentError::NothingToResume {
                        thread_id: thread_id.to_string(),
                    });
                }
                debug!(messages = current.len(), next = ?current.next_actions(), "resuming");
                current
            }
        };
        let mut pending = conversation.pending_tool_calls();
        let mut model_calls = 0usize;
        let mut tool_calls = 0usize;
        let mut state = if pending.is_empty() {
            TurnState::AwaitingModel
        } else {
            TurnState::AwaitingTool
        };
        self.transition(state, events).await;

        loop {
            if state == TurnState::AwaitingTool {
                for call in pending.drain(..) {
                    let message =
                        execute_tool_call(self.tools.as_ref(), &call, self.options.tool_timeout)
                            .await;
                    tool_calls += 1;
                    conversation = self.append(thread_id, message, events).await?;
                }
                state = TurnState::AwaitingModel;
                self.transition(state, events).await;
            }

            if model_calls >= self.options.max_model_calls {
                return Err(AgentError::RecursionLimit {
                    thread_id: thread_id.to_string(),
                    limit: self.options.max_model_calls,
                });
            }
            model_calls += 1;
            let response = self
                .invoke_model(thread_id, model_calls, &conversation)
                .await?;

            let calls = match &response {
                LlmResponse::ToolRequest { tool_calls, .. } => tool_calls.clone(),
                LlmResponse::FinalAnswer { .. } => Vec::new(),
            };
            let final_message = response.into_message();
            conversation = self
                .append(thread_id, final_message.clone(), events)
                .await?;

            if calls.is_empty() {
                state = TurnState::Done;
                self.transition(state, events).await;
                info!(model_calls, tool_calls, messages = conversation.len(), "turn done");
                return Ok(TurnOutcome {
                    thread_id: thread_id.to_string(),
                    final_message,
                    conversation,
                    model_calls,
                    tool_calls,
                });
            }

            pending = calls;
            state = TurnState::AwaitingTool;
            self.transition(state, events).await;
        }
    }
}
