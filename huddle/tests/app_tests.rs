use std::sync::Arc;

use huddle::prelude::*;
use huddle::{Generator, MemoryStore};
use huddle_llm::UnavailableClient;
use serde_json::json;

#[tokio::test]
async fn test_missing_store_config_runs_degraded_outside_production() {
    let mut app = AppBuilder::new()
        .environment(Environment::Development)
        .user(AuthUser::new("u1"))
        .build()
        .unwrap();
    assert!(app.mode().is_degraded());

    let mode = app.start().await;
    assert!(mode.is_degraded());
    let names: Vec<&str> = app.chat().channels().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["general", "random"]);
    assert!(!app.ai_chat().generator().is_available());

    app.shutdown().await;
}

#[tokio::test]
async fn test_signed_out_app_without_store_shows_placeholders() {
    let mut app = AppBuilder::new().environment(Environment::Development).build().unwrap();
    assert!(app.user().is_none());

    let mode = app.start().await;
    assert!(mode.is_degraded());
    let names: Vec<&str> = app.chat().channels().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["general", "random"]);

    app.shutdown().await;
}

#[test]
fn test_missing_store_config_fails_in_production() {
    let err = AppBuilder::new()
        .environment(Environment::Production)
        .build()
        .err()
        .unwrap();
    assert!(err.to_string().contains("required in production"));
}

#[test]
fn test_configured_store_builds_live() {
    let app = AppBuilder::new()
        .environment(Environment::Production)
        .store(StoreConfig::new("https://project.example.co", "anon"))
        .build()
        .unwrap();
    assert!(!app.mode().is_degraded());
}

#[tokio::test]
async fn test_injected_store_loads_and_shuts_down() {
    let store = Arc::new(MemoryStore::new());
    store.seed(
        "channels",
        [json!({"id": "c1", "name": "general", "type": "group", "is_private": false})],
    );
    store.seed("channel_members", [json!({"channel_id": "c1", "user_id": "u1"})]);

    let mut app = AppBuilder::new()
        .with_store(store.clone())
        .with_generator(Generator::new(Arc::new(UnavailableClient::default()), "gemini-pro"))
        .user(AuthUser::new("u1"))
        .build()
        .unwrap();

    let mode = app.start().await;
    assert!(!mode.is_degraded());
    assert_eq!(app.chat().active_channel().unwrap().id, "c1");

    app.chat_mut().send("hello").await.unwrap();
    assert_eq!(store.rows("messages").len(), 1);
    assert!(store.active_feed_count() > 0);

    app.shutdown().await;
    assert_eq!(store.active_feed_count(), 0);
}
