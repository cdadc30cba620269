use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{flag, id};

/// Separator between the two user ids of a direct channel name
pub const DIRECT_NAME_SEPARATOR: char = ':';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    /// Multi-member channel; older rows label these `public`/`private`
    #[default]
    #[serde(alias = "public", alias = "private")]
    Group,
    Direct,
}

impl ChannelKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChannelKind::Group => "group",
            ChannelKind::Direct => "direct",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    #[serde(deserialize_with = "id::deserialize")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: ChannelKind,
    #[serde(default, deserialize_with = "flag::deserialize")]
    pub is_private: bool,
    #[serde(default, deserialize_with = "id::deserialize_opt", skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Channel {
    /// Placeholder channel used while the store is unreachable
    pub fn placeholder(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            kind: ChannelKind::Group,
            is_private: false,
            created_by: None,
            created_at: None,
        }
    }

    pub fn is_direct(&self) -> bool {
        self.kind == ChannelKind::Direct
    }

    /// For a direct channel, the participant that is not `user_id`
    pub fn other_participant(&self, user_id: &str) -> Option<&str> {
        if !self.is_direct() {
            return None;
        }
        self.name
            .split(DIRECT_NAME_SEPARATOR)
            .find(|id| !id.is_empty() && *id != user_id)
    }
}

/// Canonical name of the direct channel between two users.
///
/// The ids are sorted so both participants compute the same name.
pub fn canonical_direct_name(a: &str, b: &str) -> String {
    let (first, second) = if a <= b { (a, b) } else { (b, a) };
    format!("{}{}{}", first, DIRECT_NAME_SEPARATOR, second)
}

/// Membership row linking a user to a channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelMember {
    #[serde(deserialize_with = "id::deserialize")]
    pub channel_id: String,
    #[serde(deserialize_with = "id::deserialize")]
    pub user_id: String,
    #[serde(default, deserialize_with = "flag::deserialize")]
    pub is_admin: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joined_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_read_at: Option<DateTime<Utc>>,
}

/// Member listing as shown in the channel member panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberSummary {
    #[serde(deserialize_with = "id::deserialize")]
    pub member_id: String,
    #[serde(default)]
    pub member_name: Option<String>,
    #[serde(default)]
    pub member_email: Option<String>,
    #[serde(default, deserialize_with = "flag::deserialize")]
    pub is_admin: bool,
    #[serde(default)]
    pub joined_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_name_is_order_independent() {
        assert_eq!(canonical_direct_name("bob", "alice"), "alice:bob");
        assert_eq!(
            canonical_direct_name("alice", "bob"),
            canonical_direct_name("bob", "alice")
        );
    }

    #[test]
    fn test_other_participant() {
        let mut channel = Channel::placeholder("c1", canonical_direct_name("u2", "u1"));
        channel.kind = ChannelKind::Direct;
        assert_eq!(channel.other_participant("u1"), Some("u2"));
        assert_eq!(channel.other_participant("u2"), Some("u1"));
    }

    #[test]
    fn test_legacy_kind_aliases() {
        let channel: Channel = serde_json::from_str(
            r#"{"id": 7, "name": "general", "type": "public", "is_private": false}"#,
        )
        .unwrap();
        assert_eq!(channel.id, "7");
        assert_eq!(channel.kind, ChannelKind::Group);
        assert!(channel.created_by.is_none());
    }

    #[test]
    fn test_null_flags_read_as_false() {
        let channel: Channel = serde_json::from_str(
            r#"{"id": "c1", "name": "general", "type": "group", "is_private": null}"#,
        )
        .unwrap();
        assert!(!channel.is_private);

        let member: MemberSummary =
            serde_json::from_str(r#"{"member_id": "u1", "is_admin": null}"#).unwrap();
        assert!(!member.is_admin);
    }
}
