use std::sync::Arc;

use huddle_types::{Channel, ChannelKind};
use serde_json::json;

use super::{decode, decode_all, row_set, single_row, CHANNELS};
use super::{RPC_CREATE_CHANNEL, RPC_CREATE_USER_CHANNEL, RPC_GET_USER_CHANNELS};
use crate::error::Result;
use crate::query::Query;
use crate::trait_client::RemoteStore;

#[derive(Clone)]
pub struct ChannelRepository {
    store: Arc<dyn RemoteStore>,
}

impl ChannelRepository {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    /// Channels the user belongs to, via the privileged stored function
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<Channel>> {
        let value = self
            .store
            .rpc(RPC_GET_USER_CHANNELS, json!({ "user_id": user_id }))
            .await?;
        decode_all(row_set(value))
    }

    pub async fn list_all(&self) -> Result<Vec<Channel>> {
        let rows = self
            .store
            .select(
                CHANNELS,
                Query::new().columns("id, name, description, type, is_private, created_by, created_at"),
            )
            .await?;
        decode_all(rows)
    }

    pub async fn get(&self, channel_id: &str) -> Result<Option<Channel>> {
        let rows = self
            .store
            .select(CHANNELS, Query::new().eq("id", channel_id).limit(1))
            .await?;
        rows.into_iter().next().map(decode).transpose()
    }

    /// Earliest-created direct channel with the canonical pair name
    pub async fn find_direct(&self, name: &str) -> Result<Option<Channel>> {
        let rows = self
            .store
            .select(
                CHANNELS,
                Query::new()
                    .eq("type", ChannelKind::Direct.as_str())
                    .eq("name", name)
                    .order_asc("created_at")
                    .limit(1),
            )
            .await?;
        rows.into_iter().next().map(decode).transpose()
    }

    /// Create through the stored function that bypasses row-level policies.
    /// `Ok(None)` when the function ran but returned nothing.
    pub async fn create_privileged(
        &self,
        name: &str,
        kind: ChannelKind,
        is_private: bool,
    ) -> Result<Option<Channel>> {
        let value = self
            .store
            .rpc(
                RPC_CREATE_CHANNEL,
                json!({
                    "channel_name": name,
                    "channel_type": kind.as_str(),
                    "is_private": is_private,
                }),
            )
            .await?;
        single_row(value).map(decode).transpose()
    }

    pub async fn create_direct_privileged(&self, other_user_id: &str, name: &str) -> Result<Option<Channel>> {
        let value = self
            .store
            .rpc(
                RPC_CREATE_USER_CHANNEL,
                json!({ "other_user_id": other_user_id, "channel_name": name }),
            )
            .await?;
        single_row(value).map(decode).transpose()
    }

    pub async fn insert(
        &self,
        name: &str,
        kind: ChannelKind,
        is_private: bool,
        created_by: &str,
    ) -> Result<Channel> {
        let row = self
            .store
            .insert(
                CHANNELS,
                json!({
                    "name": name,
                    "type": kind.as_str(),
                    "is_private": is_private,
                    "created_by": created_by,
                }),
            )
            .await?;
        decode(row)
    }
}
