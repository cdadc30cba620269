use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use huddle_types::{ChannelMember, MemberSummary, User};
use serde_json::json;

use super::{decode, decode_all, row_set, CHANNEL_MEMBERS, RPC_GET_CHANNEL_MEMBERS, USERS};
use crate::error::Result;
use crate::query::{Filter, Query};
use crate::trait_client::RemoteStore;

#[derive(Clone)]
pub struct MemberRepository {
    store: Arc<dyn RemoteStore>,
}

impl MemberRepository {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    pub async fn channel_ids_for_user(&self, user_id: &str) -> Result<Vec<String>> {
        let rows = self
            .store
            .select(CHANNEL_MEMBERS, Query::new().columns("channel_id").eq("user_id", user_id))
            .await?;
        Ok(rows
            .iter()
            .filter_map(|row| row.get("channel_id"))
            .map(crate::query::scalar_text)
            .collect())
    }

    pub async fn add(&self, channel_id: &str, user_id: &str, is_admin: bool) -> Result<ChannelMember> {
        let row = self
            .store
            .insert(
                CHANNEL_MEMBERS,
                json!({ "channel_id": channel_id, "user_id": user_id, "is_admin": is_admin }),
            )
            .await?;
        decode(row)
    }

    /// Set the last-read marker; returns the number of membership rows touched
    pub async fn mark_read(&self, channel_id: &str, user_id: &str, at: DateTime<Utc>) -> Result<usize> {
        let rows = self
            .store
            .update(
                CHANNEL_MEMBERS,
                &[Filter::eq("channel_id", channel_id), Filter::eq("user_id", user_id)],
                json!({ "last_read_at": at.to_rfc3339_opts(SecondsFormat::Micros, true) }),
            )
            .await?;
        Ok(rows.len())
    }

    /// Member listing through the privileged stored function
    pub async fn summaries_rpc(&self, channel_id: &str, user_id: &str) -> Result<Vec<MemberSummary>> {
        let value = self
            .store
            .rpc(
                RPC_GET_CHANNEL_MEMBERS,
                json!({ "channel_id": channel_id, "user_id": user_id }),
            )
            .await?;
        decode_all(row_set(value))
    }

    /// Member listing joined with `users` client-side, admins first
    pub async fn summaries_joined(&self, channel_id: &str) -> Result<Vec<MemberSummary>> {
        let rows = self
            .store
            .select(
                CHANNEL_MEMBERS,
                Query::new().eq("channel_id", channel_id).order_desc("is_admin"),
            )
            .await?;
        let members: Vec<ChannelMember> = decode_all(rows)?;
        if members.is_empty() {
            return Ok(Vec::new());
        }

        let user_rows = self
            .store
            .select(
                USERS,
                Query::new()
                    .columns("id, name, email")
                    .in_list("id", members.iter().map(|m| m.user_id.as_str())),
            )
            .await?;
        let users: HashMap<String, User> = decode_all::<User>(user_rows)?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();

        Ok(members
            .into_iter()
            .map(|m| {
                let user = users.get(&m.user_id);
                MemberSummary {
                    member_name: user.and_then(|u| u.name.clone()),
                    member_email: user.and_then(|u| u.email.clone()),
                    member_id: m.user_id,
                    is_admin: m.is_admin,
                    joined_at: m.joined_at,
                }
            })
            .collect())
    }
}
