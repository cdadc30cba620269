use std::sync::Arc;

use huddle_store::repositories::{ChannelRepository, MemberRepository, MessageRepository};
use huddle_store::{FeedSpec, MemoryStore, OpKind, RemoteStore, StoreError};
use huddle_types::{canonical_direct_name, ChannelKind};
use serde_json::json;

#[tokio::test]
async fn test_direct_lookup_returns_earliest_channel() {
    let store = Arc::new(MemoryStore::new());
    let channels = ChannelRepository::new(store.clone());
    let name = canonical_direct_name("u2", "u1");

    let first = channels.insert(&name, ChannelKind::Direct, true, "u1").await.unwrap();
    channels.insert(&name, ChannelKind::Direct, true, "u2").await.unwrap();

    let found = channels.find_direct(&name).await.unwrap().unwrap();
    assert_eq!(found.id, first.id);
}

#[tokio::test]
async fn test_registered_rpc_sees_tables() {
    let store = Arc::new(MemoryStore::new());
    store.seed("channels", [json!({"id": "c1", "name": "general", "type": "group"})]);
    store.seed("channel_members", [json!({"channel_id": "c1", "user_id": "u1"})]);
    store.register_rpc("get_user_channels", |store: &MemoryStore, args| {
        let user = args["user_id"].as_str().unwrap_or_default().to_string();
        let ids: Vec<String> = store
            .rows("channel_members")
            .iter()
            .filter(|m| m["user_id"] == user.as_str())
            .filter_map(|m| m["channel_id"].as_str().map(str::to_string))
            .collect();
        Ok(json!(store
            .rows("channels")
            .into_iter()
            .filter(|c| c["id"].as_str().is_some_and(|id| ids.iter().any(|i| i == id)))
            .collect::<Vec<_>>()))
    });

    let channels = ChannelRepository::new(store.clone());
    let listed = channels.list_for_user("u1").await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "general");
    assert!(channels.list_for_user("u2").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_member_join_orders_admins_first() {
    let store = Arc::new(MemoryStore::new());
    store.seed(
        "users",
        [
            json!({"id": "u1", "name": "Ada", "email": "ada@example.com"}),
            json!({"id": "u2", "name": "Bo", "email": "bo@example.com"}),
        ],
    );
    let members = MemberRepository::new(store.clone());
    members.add("c1", "u1", false).await.unwrap();
    members.add("c1", "u2", true).await.unwrap();

    let listed = members.summaries_joined("c1").await.unwrap();
    assert_eq!(listed[0].member_id, "u2");
    assert!(listed[0].is_admin);
    assert_eq!(listed[1].member_name.as_deref(), Some("Ada"));

    assert!(matches!(
        members.add("c1", "u1", false).await,
        Err(StoreError::Conflict(_))
    ));
}

#[tokio::test]
async fn test_messages_listed_oldest_first_and_fed() {
    let store = Arc::new(MemoryStore::new());
    let mut feed = store
        .subscribe(FeedSpec::new("messages").filter_eq("channel_id", "c1"))
        .await
        .unwrap();

    let messages = MessageRepository::new(store.clone());
    messages.insert("c1", "u1", "one").await.unwrap();
    messages.insert("c1", "u2", "two").await.unwrap();

    let listed = messages.list_for_channel("c1").await.unwrap();
    let contents: Vec<&str> = listed.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["one", "two"]);
    assert!(listed[0].created_at < listed[1].created_at);

    assert_eq!(feed.recv().await.unwrap().new_str("content"), Some("one"));
    assert_eq!(store.count(OpKind::Insert, "messages"), 2);
}
