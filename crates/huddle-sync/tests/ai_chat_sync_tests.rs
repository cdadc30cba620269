mod common;

use std::sync::Arc;

use common::{ai_chat_for, store_with_users, ScriptedClient, ALICE, BOB};
use huddle_llm::{GenerativeError, Generator, Role, UnavailableClient};
use huddle_store::{OpKind, RemoteStore, StoreError};
use huddle_sync::{AiChatSync, SyncError};
use huddle_types::{AuthUser, Privacy};

const PROMPT: &str = "Summarize our roadmap";

#[tokio::test]
async fn test_create_chat_from_first_prompt() {
    let store = store_with_users();
    let client = ScriptedClient::new(["\"Roadmap Summary\"\n", "Q3 ships search, Q4 ships sync."]);
    let mut ai = ai_chat_for(&store, client.clone(), ALICE);

    let chat = ai.create_chat(PROMPT).await.unwrap();

    assert_eq!(chat.title, "Roadmap Summary");
    assert_eq!(chat.privacy, Privacy::Private);
    assert_eq!(chat.created_by, ALICE);
    assert_eq!(ai.active_chat().unwrap().id, chat.id);
    assert!(!ai.is_sending());

    let messages = ai.messages();
    assert_eq!(messages.len(), 2);
    assert!(!messages[0].is_ai);
    assert_eq!(messages[0].content, PROMPT);
    assert_eq!(messages[0].user_id.as_deref(), Some(ALICE));
    assert!(messages[1].is_ai);
    assert!(messages[1].user_id.is_none());

    let requests = client.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].turns[0].text.contains("short title"));
    assert!(requests[0].turns[0].text.contains(PROMPT));
    assert_eq!(requests[1].turns.len(), 1);
    assert_eq!(requests[1].turns[0].text, PROMPT);

    assert_eq!(ai.session().unwrap().user_turns(), 1);
    assert_eq!(ai.chats().len(), 1);
}

#[tokio::test]
async fn test_follow_up_uses_session_and_bumps_chat() {
    let store = store_with_users();
    let client = ScriptedClient::new(["Roadmap", "Long answer", "Short answer"]);
    let mut ai = ai_chat_for(&store, client.clone(), ALICE);
    let chat = ai.create_chat(PROMPT).await.unwrap();

    let reply = ai.send_message("Shorter please").await.unwrap();

    assert!(reply.is_ai);
    assert_eq!(reply.content, "Short answer");
    assert_eq!(ai.messages().len(), 4);
    assert_eq!(ai.messages().last().unwrap().id, reply.id);

    let follow_up = client.requests().pop().unwrap();
    let texts: Vec<&str> = follow_up.turns.iter().map(|t| t.text.as_str()).collect();
    assert_eq!(texts, vec![PROMPT, "Shorter please"]);
    assert!(follow_up.turns.iter().all(|t| t.role == Role::User));

    let session = ai.session().unwrap();
    assert_eq!(session.user_turns(), 2);
    assert_eq!(session.history().last().unwrap().role, Role::Model);

    assert!(ai.chats()[0].updated_at > chat.updated_at);
    assert_eq!(store.count(OpKind::Update, "ai_chats"), 1);
}

#[tokio::test]
async fn test_blank_prompts_are_rejected() {
    let store = store_with_users();
    let client = ScriptedClient::new(Vec::<String>::new());
    let mut ai = ai_chat_for(&store, client.clone(), ALICE);

    assert!(matches!(ai.create_chat("  ").await, Err(SyncError::EmptyContent)));
    assert!(matches!(ai.send_message("hi").await, Err(SyncError::NoActiveSelection("chat"))));
    assert!(client.requests().is_empty());
    assert_eq!(store.count(OpKind::Insert, "ai_chats"), 0);
}

#[tokio::test]
async fn test_model_failure_keeps_written_rows() {
    let store = store_with_users();
    let client = ScriptedClient::new(["Roadmap"]);
    client.push_error(GenerativeError::Api {
        status: 503,
        message: "model overloaded".to_string(),
    });
    let mut ai = ai_chat_for(&store, client, ALICE);

    let err = ai.create_chat(PROMPT).await.unwrap_err();

    assert!(matches!(err, SyncError::Generative(GenerativeError::Api { status: 503, .. })));
    assert!(!ai.is_sending());
    assert!(ai.last_error().unwrap().contains("model overloaded"));
    assert!(ai.active_chat().is_none());
    assert_eq!(store.rows("ai_chats").len(), 1);
    let messages = store.rows("ai_messages");
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["is_ai"], false);
}

#[tokio::test]
async fn test_unconfigured_model_falls_back_to_prompt_title() {
    let store = store_with_users();
    let remote: Arc<dyn RemoteStore> = store.clone();
    let generator = Generator::new(Arc::new(UnavailableClient::default()), "gemini-pro");
    let mut ai = AiChatSync::new(remote, generator, Some(AuthUser::new(ALICE)));
    assert!(!ai.generator().is_available());

    let err = ai.create_chat(PROMPT).await.unwrap_err();

    assert!(matches!(err, SyncError::Generative(GenerativeError::Unavailable(_))));
    let chats = store.rows("ai_chats");
    assert_eq!(chats[0]["title"], "Summarize our roadmap...");
}

#[tokio::test]
async fn test_only_creator_changes_privacy_or_deletes() {
    let store = store_with_users();
    let mut alice = ai_chat_for(&store, ScriptedClient::new(["Roadmap", "Answer"]), ALICE);
    let mut bob = ai_chat_for(&store, ScriptedClient::new(Vec::<String>::new()), BOB);
    let chat = alice.create_chat(PROMPT).await.unwrap();

    assert!(matches!(
        bob.update_chat_privacy(&chat.id, Privacy::Public).await,
        Err(SyncError::NotCreator(_))
    ));
    assert!(matches!(bob.delete_chat(&chat.id).await, Err(SyncError::NotCreator(_))));
    assert!(bob.last_error().is_some());
    assert_eq!(store.rows("ai_chats").len(), 1);

    let updated = alice.update_chat_privacy(&chat.id, Privacy::Team).await.unwrap();
    assert_eq!(updated.privacy, Privacy::Team);
    assert_eq!(alice.active_chat().unwrap().privacy, Privacy::Team);

    alice.delete_chat(&chat.id).await.unwrap();
    assert!(alice.chats().is_empty());
    assert!(alice.active_chat().is_none());
    assert!(alice.session().is_none());
    assert!(!alice.has_message_feed());
}

#[tokio::test]
async fn test_participants_are_added_and_removed() {
    let store = store_with_users();
    let mut ai = ai_chat_for(&store, ScriptedClient::new(["Roadmap", "Answer"]), ALICE);
    let chat = ai.create_chat(PROMPT).await.unwrap();

    let participant = ai.add_participant(&chat.id, BOB).await.unwrap();
    assert!(!participant.can_edit);
    assert_eq!(ai.participants().len(), 1);

    let duplicate = ai.add_participant(&chat.id, BOB).await.unwrap_err();
    assert!(matches!(duplicate, SyncError::Store(StoreError::Conflict(_))));

    assert_eq!(ai.remove_participant(&chat.id, BOB).await.unwrap(), 1);
    assert!(ai.participants().is_empty());
    assert_eq!(ai.remove_participant(&chat.id, BOB).await.unwrap(), 0);
}

#[tokio::test]
async fn test_other_participants_prompts_join_session() {
    let store = store_with_users();
    let mut alice = ai_chat_for(&store, ScriptedClient::new(["Roadmap", "Answer", "Follow-up"]), ALICE);
    let mut bob = ai_chat_for(&store, ScriptedClient::new(Vec::<String>::new()), BOB);
    let chat = alice.create_chat(PROMPT).await.unwrap();

    bob.select_by_id(&chat.id).await.unwrap();
    assert_eq!(bob.messages().len(), 2);
    assert_eq!(bob.session().unwrap().user_turns(), 1);

    alice.send_message("What about hiring?").await.unwrap();
    assert_eq!(bob.sync_pending().await, 2);
    assert_eq!(bob.messages().len(), 4);
    assert_eq!(bob.session().unwrap().user_turns(), 2);

    // own writes echo back through the feed without duplicating
    alice.sync_pending().await;
    assert_eq!(alice.messages().len(), 4);
}

#[tokio::test]
async fn test_chat_feed_tracks_remote_changes() {
    let store = store_with_users();
    let mut alice = ai_chat_for(&store, ScriptedClient::new(["Roadmap", "Answer"]), ALICE);
    let mut bob = ai_chat_for(&store, ScriptedClient::new(Vec::<String>::new()), BOB);
    bob.load().await.unwrap();
    assert!(bob.chats().is_empty());

    let chat = alice.create_chat(PROMPT).await.unwrap();
    bob.sync_pending().await;
    assert_eq!(bob.chats().len(), 1);

    bob.select_by_id(&chat.id).await.unwrap();
    alice.update_chat_privacy(&chat.id, Privacy::Public).await.unwrap();
    bob.sync_pending().await;
    assert_eq!(bob.active_chat().unwrap().privacy, Privacy::Public);

    alice.delete_chat(&chat.id).await.unwrap();
    bob.sync_pending().await;
    assert!(bob.chats().is_empty());
    assert!(bob.active_chat().is_none());
    assert!(bob.messages().is_empty());

    bob.dispose().await;
    alice.dispose().await;
    assert_eq!(store.active_feed_count(), 0);
}

#[tokio::test]
async fn test_listing_requires_user() {
    let store = store_with_users();
    let remote: Arc<dyn RemoteStore> = store.clone();
    let generator = Generator::new(ScriptedClient::new(Vec::<String>::new()), "gemini-pro");
    let mut ai = AiChatSync::new(remote, generator, None);
    assert!(matches!(ai.list_chats().await, Err(SyncError::NotAuthenticated)));
}
