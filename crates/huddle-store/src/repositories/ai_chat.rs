use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use huddle_types::{AiChat, AiChatParticipant, AiMessage, Privacy};
use serde_json::json;

use super::{decode, decode_all, AI_CHATS, AI_CHAT_PARTICIPANTS, AI_MESSAGES};
use crate::error::Result;
use crate::query::{Filter, Query};
use crate::trait_client::RemoteStore;

#[derive(Clone)]
pub struct AiChatRepository {
    store: Arc<dyn RemoteStore>,
}

impl AiChatRepository {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    /// Chats visible to the caller, most recently active first
    pub async fn list(&self) -> Result<Vec<AiChat>> {
        let rows = self
            .store
            .select(AI_CHATS, Query::new().order_desc("updated_at"))
            .await?;
        decode_all(rows)
    }

    pub async fn get(&self, chat_id: &str) -> Result<Option<AiChat>> {
        let rows = self
            .store
            .select(AI_CHATS, Query::new().eq("id", chat_id).limit(1))
            .await?;
        rows.into_iter().next().map(decode).transpose()
    }

    pub async fn insert(&self, title: &str, created_by: &str, privacy: Privacy) -> Result<AiChat> {
        let row = self
            .store
            .insert(
                AI_CHATS,
                json!({ "title": title, "created_by": created_by, "privacy": privacy }),
            )
            .await?;
        decode(row)
    }

    /// Bump `updated_at`
    pub async fn touch(&self, chat_id: &str, at: DateTime<Utc>) -> Result<Vec<AiChat>> {
        let rows = self
            .store
            .update(
                AI_CHATS,
                &[Filter::eq("id", chat_id)],
                json!({ "updated_at": at.to_rfc3339_opts(SecondsFormat::Micros, true) }),
            )
            .await?;
        decode_all(rows)
    }

    /// Change privacy; only rows created by `creator_id` match
    pub async fn set_privacy(&self, chat_id: &str, creator_id: &str, privacy: Privacy) -> Result<Vec<AiChat>> {
        let rows = self
            .store
            .update(
                AI_CHATS,
                &[Filter::eq("id", chat_id), Filter::eq("created_by", creator_id)],
                json!({ "privacy": privacy }),
            )
            .await?;
        decode_all(rows)
    }

    /// Delete; only rows created by `creator_id` match
    pub async fn delete(&self, chat_id: &str, creator_id: &str) -> Result<usize> {
        let rows = self
            .store
            .delete(
                AI_CHATS,
                &[Filter::eq("id", chat_id), Filter::eq("created_by", creator_id)],
            )
            .await?;
        Ok(rows.len())
    }
}

#[derive(Clone)]
pub struct AiMessageRepository {
    store: Arc<dyn RemoteStore>,
}

impl AiMessageRepository {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    pub async fn list_for_chat(&self, chat_id: &str) -> Result<Vec<AiMessage>> {
        let rows = self
            .store
            .select(
                AI_MESSAGES,
                Query::new().eq("chat_id", chat_id).order_asc("created_at"),
            )
            .await?;
        decode_all(rows)
    }

    pub async fn insert_human(&self, chat_id: &str, user_id: &str, content: &str) -> Result<AiMessage> {
        let row = self
            .store
            .insert(
                AI_MESSAGES,
                json!({ "chat_id": chat_id, "user_id": user_id, "is_ai": false, "content": content }),
            )
            .await?;
        decode(row)
    }

    pub async fn insert_ai(&self, chat_id: &str, content: &str) -> Result<AiMessage> {
        let row = self
            .store
            .insert(
                AI_MESSAGES,
                json!({ "chat_id": chat_id, "user_id": null, "is_ai": true, "content": content }),
            )
            .await?;
        decode(row)
    }
}

#[derive(Clone)]
pub struct ParticipantRepository {
    store: Arc<dyn RemoteStore>,
}

impl ParticipantRepository {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    pub async fn list_for_chat(&self, chat_id: &str) -> Result<Vec<AiChatParticipant>> {
        let rows = self
            .store
            .select(AI_CHAT_PARTICIPANTS, Query::new().eq("chat_id", chat_id))
            .await?;
        decode_all(rows)
    }

    pub async fn add(&self, chat_id: &str, user_id: &str, can_edit: bool) -> Result<AiChatParticipant> {
        let row = self
            .store
            .insert(
                AI_CHAT_PARTICIPANTS,
                json!({ "chat_id": chat_id, "user_id": user_id, "can_edit": can_edit }),
            )
            .await?;
        decode(row)
    }

    pub async fn remove(&self, chat_id: &str, user_id: &str) -> Result<usize> {
        let rows = self
            .store
            .delete(
                AI_CHAT_PARTICIPANTS,
                &[Filter::eq("chat_id", chat_id), Filter::eq("user_id", user_id)],
            )
            .await?;
        Ok(rows.len())
    }
}
