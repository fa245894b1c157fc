//! Integration tests for TurnController: full turns against the in-memory store.


use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use threadline::{
    AgentError, ConversationStore, LlmClient, LlmError, LlmResponse, Message, MockLlm,
    MockToolSource, ToolCall, TurnController, TurnOptions, TOOL_ERROR_TEMPLATE,
};

const SEARCH: &str = "tavily_search_results_json";

/// Answers from the conversation history: remembers an age stated earlier.
struct RememberingLlm;

#[async_trait]
impl LlmClient for RememberingLlm {
    async fn invoke(&self, messages: &[Message]) -> Result<LlmResponse, LlmError> {
        let last = messages.last().map(|m| m.content()).unwrap_or_default();
        let content = if last.contains("How old am I") {
            let age = messages
                .iter()
                .filter(|m| m.role() == "human")
                .find_map(|m| {
                    m.content()
                        .split_whitespace()
                        .find(|w| w.chars().all(|c| c.is_ascii_digit()))
                        .map(str::to_string)
                });
            match age {
                Some(age) => format!("You told me you are {} years old.", age),
                None => "I don't know your age.".to_string(),
            }
        } else {
            "Nice to meet you!".to_string()
        };
        Ok(LlmResponse::FinalAnswer {
            content,
            usage: None,
        })
    }
}

/// Never answers within any reasonable timeout.
struct StalledLlm;

#[async_trait]
impl LlmClient for StalledLlm {
    async fn invoke(&self, _messages: &[Message]) -> Result<LlmResponse, LlmError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(LlmResponse::FinalAnswer {
            content: "late".into(),
            usage: None,
        })
    }
}

/// Stalls on the first call only; answers "recovered" afterwards.
#[derive(Default)]
struct StallOnceLlm {
    calls: AtomicUsize,
}

#[async_trait]
impl LlmClient for StallOnceLlm {
    async fn invoke(&self, _messages: &[Message]) -> Result<LlmResponse, LlmError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
        Ok(LlmResponse::FinalAnswer {
            content: "recovered".into(),
            usage: None,
        })
    }
}

fn tool_request(ids: &[&str]) -> LlmResponse {
    LlmResponse::ToolRequest {
        content: String::new(),
        tool_calls: ids
            .iter()
            .map(|id| ToolCall {
                id: id.to_string(),
                name: SEARCH.to_string(),
                arguments: r#"{"query":"weather"}"#.to_string(),
            })
            .collect(),
        usage: None,
    }
}

fn final_answer(text: &str) -> LlmResponse {
    LlmResponse::FinalAnswer {
        content: text.into(),
        usage: None,
    }
}

fn controller(llm: Arc<dyn LlmClient>, tools: MockToolSource) -> TurnController {
    TurnController::new(llm, Arc::new(tools), Arc::new(ConversationStore::in_memory()))
}

#[tokio::test]
async fn second_turn_sees_first_turn_history() {
    let c = controller(
        Arc::new(RememberingLlm),
        MockToolSource::replying(SEARCH, "[]"),
    );
    let first = c
        .run_turn("1", "My name is Reda and I am 100 years old.")
        .await
        .unwrap();
    assert!(!first.reply().is_empty());
    assert!(first.conversation.pending_tool_calls().is_empty());

    let second = c.run_turn("1", "How old am I?").await.unwrap();
    assert!(second.reply().contains("100"), "{}", second.reply());
    assert_eq!(second.conversation.len(), 4);

    let snapshot = c.store().snapshot("1").await.unwrap();
    assert!(snapshot.next.is_empty());
    assert_eq!(snapshot.values, second.conversation);
}

#[tokio::test]
async fn tool_results_follow_their_request_in_order() {
    let llm = MockLlm::scripted(vec![tool_request(&["a", "b"]), final_answer("sunny")]);
    let c = controller(Arc::new(llm), MockToolSource::replying(SEARCH, "[{}]"));
    let out = c.run_turn("t", "weather?").await.unwrap();
    let roles: Vec<&str> = out.conversation.messages.iter().map(|m| m.role()).collect();
    assert_eq!(roles, vec!["human", "ai", "tool", "tool", "ai"]);
    let ids: Vec<&str> = out.conversation.messages[2..4]
        .iter()
        .map(|m| match m {
            Message::Tool { tool_call_id, .. } => tool_call_id.as_str(),
            _ => "",
        })
        .collect();
    assert_eq!(ids, vec!["a", "b"]);
    assert_eq!(out.tool_calls, 2);
    assert_eq!(out.model_calls, 2);
}

#[tokio::test]
async fn tool_failure_is_recorded_and_turn_completes() {
    let llm = Arc::new(MockLlm::with_tool_call_then_answer(
        SEARCH,
        r#"{"query":"x"}"#,
        "Search is down, answering from memory.",
    ));
    let c = controller(llm.clone(), MockToolSource::failing(SEARCH, "503 upstream"));
    let out = c.run_turn("t", "search something").await.unwrap();
    assert_eq!(out.reply(), "Search is down, answering from memory.");
    match &out.conversation.messages[2] {
        Message::Tool {
            is_error, content, ..
        } => {
            assert!(*is_error);
            assert!(content.starts_with("Error: "));
            assert!(content.contains("503 upstream"));
            assert!(content.ends_with(TOOL_ERROR_TEMPLATE.split("{error}").nth(1).unwrap()));
        }
        other => panic!("expected tool message, got {:?}", other),
    }
    // The model saw the error result on its second call.
    assert_eq!(llm.received()[1].len(), 3);
}

#[tokio::test]
async fn unknown_tool_becomes_error_result() {
    let llm = MockLlm::with_tool_call_then_answer("no_such_tool", "{}", "ok");
    let c = controller(Arc::new(llm), MockToolSource::replying(SEARCH, "[]"));
    let out = c.run_turn("t", "go").await.unwrap();
    assert!(matches!(
        &out.conversation.messages[2],
        Message::Tool { is_error: true, content, .. } if content.contains("not found")
    ));
}

#[tokio::test]
async fn model_failure_is_fatal_with_thread_and_step() {
    let c = controller(
        Arc::new(MockLlm::failing("connection refused")),
        MockToolSource::replying(SEARCH, "[]"),
    );
    let err = c.run_turn("thread-9", "hi").await.unwrap_err();
    match &err {
        AgentError::ModelInvocation {
            thread_id, step, ..
        } => {
            assert_eq!(thread_id, "thread-9");
            assert_eq!(*step, 1);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    // The human message was still recorded.
    assert_eq!(c.store().get("thread-9").await.unwrap().len(), 1);
}

#[tokio::test]
async fn model_timeout_surfaces_as_timeout() {
    let c = controller(Arc::new(StalledLlm), MockToolSource::replying(SEARCH, "[]"))
        .with_options(TurnOptions {
            model_timeout: Duration::from_millis(30),
            ..Default::default()
        });
    let err = c.run_turn("t", "hi").await.unwrap_err();
    assert!(err.is_timeout(), "{:?}", err);
}

#[tokio::test]
async fn tool_timeout_is_recovered() {
    let llm = MockLlm::with_tool_call_then_answer(SEARCH, "{}", "done");
    let c = controller(
        Arc::new(llm),
        MockToolSource::sleeping(SEARCH, Duration::from_secs(10)),
    )
    .with_options(TurnOptions {
        tool_timeout: Duration::from_millis(20),
        ..Default::default()
    });
    let out = c.run_turn("t", "go").await.unwrap();
    assert_eq!(out.reply(), "done");
    assert!(matches!(
        &out.conversation.messages[2],
        Message::Tool { is_error: true, content, .. } if content.contains("timed out")
    ));
}

#[tokio::test]
async fn endless_tool_requests_hit_recursion_limit() {
    let llm = MockLlm::scripted(vec![tool_request(&["again"])]);
    let c = controller(Arc::new(llm), MockToolSource::replying(SEARCH, "[]")).with_options(
        TurnOptions {
            max_model_calls: 3,
            ..Default::default()
        },
    );
    let err = c.run_turn("loop", "go").await.unwrap_err();
    assert!(matches!(
        err,
        AgentError::RecursionLimit { ref thread_id, limit: 3 } if thread_id == "loop"
    ));
    // human + 3 × (ai + tool)
    assert_eq!(c.store().get("loop").await.unwrap().len(), 7);
}

#[tokio::test]
async fn leaked_control_tokens_are_stored_verbatim() {
    let text = "The answer is 42.[END_TOOL_REQUEST]";
    let c = controller(
        Arc::new(MockLlm::with_no_tool_calls(text)),
        MockToolSource::replying(SEARCH, "[]"),
    );
    let out = c.run_turn("t", "q").await.unwrap();
    assert_eq!(out.reply(), text);
}

#[tokio::test]
async fn concurrent_turns_on_one_thread_keep_tool_results_adjacent() {
    let llm = MockLlm::scripted(vec![
        tool_request(&["first"]),
        final_answer("done"),
        tool_request(&["second"]),
        final_answer("done"),
    ]);
    let c = Arc::new(controller(
        Arc::new(llm),
        MockToolSource::sleeping(SEARCH, Duration::from_millis(50)),
    ));

    let a = tokio::spawn({
        let c = c.clone();
        async move { c.run_turn("1", "A").await }
    });
    let b = tokio::spawn({
        let c = c.clone();
        async move { c.run_turn("1", "B").await }
    });
    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    let conv = c.store().get("1").await.unwrap();
    let roles: Vec<&str> = conv.messages.iter().map(|m| m.role()).collect();
    assert_eq!(
        roles,
        vec!["human", "ai", "tool", "ai", "human", "ai", "tool", "ai"]
    );
    for (i, m) in conv.messages.iter().enumerate() {
        if !m.tool_calls().is_empty() {
            assert!(
                matches!(&conv.messages[i + 1], Message::Tool { tool_call_id, .. }
                    if *tool_call_id == m.tool_calls()[0].id),
                "tool result must follow its request: {:?}",
                roles
            );
        }
    }
}

#[tokio::test]
async fn resume_after_model_timeout_finishes_the_turn() {
    let c = controller(
        Arc::new(StallOnceLlm::default()),
        MockToolSource::replying(SEARCH, "[]"),
    )
    .with_options(TurnOptions {
        model_timeout: Duration::from_millis(30),
        ..Default::default()
    });
    let err = c.run_turn("t", "hi").await.unwrap_err();
    assert!(err.is_timeout(), "{:?}", err);
    let snap = c.store().snapshot("t").await.unwrap();
    assert_eq!(snap.next, vec!["model"]);

    let out = c.resume("t").await.unwrap();
    assert_eq!(out.reply(), "recovered");
    assert_eq!(out.model_calls, 1);
    let roles: Vec<&str> = out.conversation.messages.iter().map(|m| m.role()).collect();
    assert_eq!(roles, vec!["human", "ai"]);
    assert!(c.store().snapshot("t").await.unwrap().next.is_empty());

    let err = c.resume("t").await.unwrap_err();
    assert!(matches!(err, AgentError::NothingToResume { ref thread_id } if thread_id == "t"));
}

#[tokio::test]
async fn resume_runs_unanswered_tool_calls_first() {
    let tools = Arc::new(MockToolSource::replying(SEARCH, "[\"sunny\"]"));
    let c = TurnController::new(
        Arc::new(MockLlm::with_no_tool_calls("It is sunny.")),
        tools.clone(),
        Arc::new(ConversationStore::in_memory()),
    );
    let call = ToolCall {
        id: "pending".into(),
        name: SEARCH.into(),
        arguments: r#"{"query":"weather"}"#.into(),
    };
    c.store()
        .append("t", Message::human("weather?"))
        .await
        .unwrap();
    c.store()
        .append("t", Message::ai_with_tool_calls("", vec![call], None))
        .await
        .unwrap();
    assert_eq!(c.store().snapshot("t").await.unwrap().next, vec!["tools"]);

    let out = c.resume("t").await.unwrap();
    assert_eq!(out.tool_calls, 1);
    assert_eq!(tools.calls().len(), 1);
    assert!(matches!(
        &out.conversation.messages[2],
        Message::Tool { tool_call_id, .. } if tool_call_id == "pending"
    ));
    assert_eq!(out.reply(), "It is sunny.");
}

#[tokio::test]
async fn resume_on_unknown_thread_is_nothing_to_resume() {
    let c = controller(
        Arc::new(MockLlm::with_no_tool_calls("x")),
        MockToolSource::replying(SEARCH, "[]"),
    );
    assert!(matches!(
        c.resume("nobody").await.unwrap_err(),
        AgentError::NothingToResume { .. }
    ));
}
