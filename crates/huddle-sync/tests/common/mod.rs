#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use huddle_llm::{GenerateRequest, GenerateResponse, GenerativeClient, GenerativeError, Generator};
use huddle_store::{MemoryStore, RemoteStore};
use huddle_sync::{AiChatSync, ChatSync};
use huddle_types::{AuthUser, Environment};
use serde_json::json;

pub const ALICE: &str = "a1c3-alice";
pub const BOB: &str = "b0b5-bob";

/// Generative client answering from a queue and recording every request
#[derive(Default)]
pub struct ScriptedClient {
    replies: Mutex<VecDeque<Result<String, GenerativeError>>>,
    requests: Mutex<Vec<GenerateRequest>>,
}

impl ScriptedClient {
    pub fn new<I, S>(replies: I) -> Arc<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let client = Self::default();
        client
            .replies
            .lock()
            .unwrap()
            .extend(replies.into_iter().map(|r| Ok(r.into())));
        Arc::new(client)
    }

    pub fn push_error(&self, error: GenerativeError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerativeClient for ScriptedClient {
    async fn generate(&self, request: GenerateRequest) -> huddle_llm::Result<GenerateResponse> {
        self.requests.lock().unwrap().push(request);
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(GenerateResponse::text(text)),
            Some(Err(e)) => Err(e),
            None => Err(GenerativeError::EmptyResponse),
        }
    }
}

pub fn store_with_users() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.seed(
        "users",
        [
            json!({"id": ALICE, "name": "", "email": "alice.smith@example.com", "role": "member"}),
            json!({"id": BOB, "name": "Bob Stone", "email": "bob@example.com", "role": "admin"}),
        ],
    );
    store
}

pub fn chat_for(store: &Arc<MemoryStore>, user_id: &str) -> ChatSync {
    let remote: Arc<dyn RemoteStore> = store.clone();
    ChatSync::new(remote, Some(AuthUser::new(user_id)), Environment::Test)
}

pub fn ai_chat_for(store: &Arc<MemoryStore>, client: Arc<ScriptedClient>, user_id: &str) -> AiChatSync {
    let remote: Arc<dyn RemoteStore> = store.clone();
    let generator = Generator::new(client, "gemini-pro");
    AiChatSync::new(remote, generator, Some(AuthUser::new(user_id)))
}

/// Group channel with the given members (first one is admin)
pub fn seed_channel(store: &MemoryStore, id: &str, name: &str, members: &[&str]) {
    store.seed(
        "channels",
        [json!({"id": id, "name": name, "type": "group", "is_private": false, "created_by": members.first()})],
    );
    for (index, member) in members.iter().enumerate() {
        store.seed(
            "channel_members",
            [json!({"channel_id": id, "user_id": member, "is_admin": index == 0})],
        );
    }
}
