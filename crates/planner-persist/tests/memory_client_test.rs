use planner_llm::Message;
use planner_persist::{
    InMemoryPersistenceClient, PersistError, PersistenceClient, ThreadSearch, ThreadStatus,
    DEFAULT_MAX_CHECKPOINTS,
};
use planner_types::{PlannerState, RunConfig};
use serde_json::{json, Map, Value};

fn metadata(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

#[tokio::test]
async fn test_thread_lifecycle() {
    let store = InMemoryPersistenceClient::new();

    let thread = store
        .create_thread(None, metadata(json!({ "graph_id": "agent" })))
        .await
        .unwrap();
    assert_eq!(thread.status, ThreadStatus::Idle);
    assert!(thread.values.is_none());

    let fetched = store.get_thread(&thread.thread_id).await.unwrap().unwrap();
    assert_eq!(fetched.metadata["graph_id"], "agent");

    store.delete_thread(&thread.thread_id).await.unwrap();
    assert!(store.get_thread(&thread.thread_id).await.unwrap().is_none());
    assert!(matches!(
        store.delete_thread(&thread.thread_id).await,
        Err(PersistError::ThreadNotFound(_))
    ));
}

#[tokio::test]
async fn test_duplicate_thread_id_rejected() {
    let store = InMemoryPersistenceClient::new();
    store.create_thread(Some("t1".into()), Map::new()).await.unwrap();

    assert!(matches!(
        store.create_thread(Some("t1".into()), Map::new()).await,
        Err(PersistError::ThreadExists(_))
    ));
}

#[tokio::test]
async fn test_busy_guard() {
    let store = InMemoryPersistenceClient::new();
    store.create_thread(Some("t1".into()), Map::new()).await.unwrap();

    store.acquire_for_run("t1").await.unwrap();
    assert!(matches!(
        store.acquire_for_run("t1").await,
        Err(PersistError::ThreadBusy(_))
    ));

    store.set_status("t1", ThreadStatus::Interrupted).await.unwrap();
    assert!(store.acquire_for_run("t1").await.is_ok());
}

#[tokio::test]
async fn test_checkpoints_update_values_and_history() {
    let store = InMemoryPersistenceClient::new().with_max_checkpoints(2);
    store.create_thread(Some("t1".into()), Map::new()).await.unwrap();

    let mut state = PlannerState::new("t1", RunConfig::default());
    for node in ["agent", "tools", "agent"] {
        state.add_message(Message::human(node));
        store.save_checkpoint("t1", node, &state).await.unwrap();
    }

    let thread = store.get_thread("t1").await.unwrap().unwrap();
    assert_eq!(thread.values.unwrap().messages.len(), 3);

    let history = store.get_history("t1", None).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].node, "agent");
    assert_eq!(history[0].values.messages.len(), 3);
    assert_eq!(history[1].node, "tools");

    assert_eq!(store.get_history("t1", Some(1)).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_history_is_capped_by_default() {
    let store = InMemoryPersistenceClient::new();
    store.create_thread(Some("t1".into()), Map::new()).await.unwrap();

    let mut state = PlannerState::new("t1", RunConfig::default());
    for step in 0..DEFAULT_MAX_CHECKPOINTS + 5 {
        state.add_message(Message::human(format!("step {}", step)));
        store.save_checkpoint("t1", "agent", &state).await.unwrap();
    }

    let history = store.get_history("t1", None).await.unwrap();
    assert_eq!(history.len(), DEFAULT_MAX_CHECKPOINTS);
    assert_eq!(history[0].values.messages.len(), DEFAULT_MAX_CHECKPOINTS + 5);
}

#[tokio::test]
async fn test_search_filters() {
    let store = InMemoryPersistenceClient::new();
    store
        .create_thread(Some("a".into()), metadata(json!({ "user": "ana" })))
        .await
        .unwrap();
    store
        .create_thread(Some("b".into()), metadata(json!({ "user": "bo" })))
        .await
        .unwrap();
    store.set_status("b", ThreadStatus::Error).await.unwrap();

    let by_meta = store
        .search_threads(ThreadSearch {
            metadata: metadata(json!({ "user": "ana" })),
            ..ThreadSearch::default()
        })
        .await
        .unwrap();
    assert_eq!(by_meta.len(), 1);
    assert_eq!(by_meta[0].thread_id, "a");

    let by_status = store
        .search_threads(ThreadSearch {
            status: Some(ThreadStatus::Error),
            ..ThreadSearch::default()
        })
        .await
        .unwrap();
    assert_eq!(by_status[0].thread_id, "b");

    let all = store.search_threads(ThreadSearch::default()).await.unwrap();
    assert_eq!(all[0].thread_id, "b");
}
