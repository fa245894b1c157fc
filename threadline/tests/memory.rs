//! Integration tests for ConversationStore over MemorySaver and SqliteSaver.


use std::sync::Arc;

use threadline::{
    CheckpointSource, Conversation, ConversationStore, JsonSerializer, Message, SqliteSaver,
};

#[tokio::test]
async fn conversation_only_grows() {
    let store = ConversationStore::in_memory();
    let mut previous: Vec<Message> = Vec::new();
    for i in 0..5 {
        let conv = store
            .append("t", Message::human(format!("message {}", i)))
            .await
            .unwrap();
        assert_eq!(conv.len(), previous.len() + 1);
        assert_eq!(&conv.messages[..previous.len()], previous.as_slice());
        previous = conv.messages;
    }
}

#[tokio::test]
async fn concurrent_threads_do_not_interleave() {
    let store = Arc::new(ConversationStore::in_memory());
    let mut handles = Vec::new();
    for t in 0..4 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            let thread_id = format!("thread-{}", t);
            for i in 0..10 {
                store
                    .append(&thread_id, Message::human(format!("{}:{}", t, i)))
                    .await
                    .unwrap();
            }
        }));
    }
    for h in handles {
        h.await.unwrap();
    }
    for t in 0..4 {
        let conv = store.get(&format!("thread-{}", t)).await.unwrap();
        let contents: Vec<String> = conv
            .messages
            .iter()
            .map(|m| m.content().to_string())
            .collect();
        let expected: Vec<String> = (0..10).map(|i| format!("{}:{}", t, i)).collect();
        assert_eq!(contents, expected);
    }
}

#[tokio::test]
async fn concurrent_appends_on_one_thread_lose_nothing() {
    let store = Arc::new(ConversationStore::in_memory());
    let mut handles = Vec::new();
    for i in 0..16 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store
                .append("shared", Message::human(i.to_string()))
                .await
                .unwrap();
        }));
    }
    for h in handles {
        h.await.unwrap();
    }
    let history = store.history("shared", None).await.unwrap();
    assert_eq!(history.len(), 16);
    assert_eq!(history[0].values.len(), 16);
    assert_eq!(history[0].step(), 15);
}

#[tokio::test]
async fn sqlite_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("threads.db");
    let open = || -> ConversationStore {
        ConversationStore::new(Arc::new(
            SqliteSaver::<Conversation>::new(&path, Arc::new(JsonSerializer)).unwrap(),
        ))
    };

    let checkpoint_id = {
        let store = open();
        store.append("1", Message::human("Hi there!")).await.unwrap();
        store.append("1", Message::ai("Hello!")).await.unwrap();
        store
            .snapshot("1")
            .await
            .unwrap()
            .checkpoint_id()
            .unwrap()
            .to_string()
    };

    let store = open();
    let snapshot = store.snapshot("1").await.unwrap();
    assert_eq!(snapshot.checkpoint_id(), Some(checkpoint_id.as_str()));
    assert_eq!(snapshot.values.len(), 2);
    assert_eq!(snapshot.values.last_ai_reply(), Some("Hello!"));
    assert_eq!(
        snapshot.metadata.as_ref().unwrap().source,
        CheckpointSource::Loop
    );

    let again = store.snapshot_at("1", &checkpoint_id).await.unwrap();
    assert_eq!(again, snapshot);

    let history = store.history("1", None).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(
        history[0].parent_config.as_ref().unwrap().checkpoint_id,
        history[1].config.checkpoint_id
    );
    assert!(store.get("2").await.unwrap().is_empty());
}
