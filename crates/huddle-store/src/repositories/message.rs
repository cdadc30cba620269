use std::sync::Arc;

use huddle_types::Message;
use serde_json::json;

use super::{decode, decode_all, MESSAGES};
use crate::error::Result;
use crate::query::Query;
use crate::trait_client::RemoteStore;

#[derive(Clone)]
pub struct MessageRepository {
    store: Arc<dyn RemoteStore>,
}

impl MessageRepository {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    /// Channel history, oldest first
    pub async fn list_for_channel(&self, channel_id: &str) -> Result<Vec<Message>> {
        let rows = self
            .store
            .select(
                MESSAGES,
                Query::new().eq("channel_id", channel_id).order_asc("created_at"),
            )
            .await?;
        decode_all(rows)
    }

    pub async fn insert(&self, channel_id: &str, user_id: &str, content: &str) -> Result<Message> {
        let row = self
            .store
            .insert(
                MESSAGES,
                json!({ "channel_id": channel_id, "user_id": user_id, "content": content }),
            )
            .await?;
        decode(row)
    }
}
