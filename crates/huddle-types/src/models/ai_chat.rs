use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::id;

/// Who can see an AI chat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Privacy {
    #[default]
    Private,
    /// Visible to the chat's participant list
    Team,
    Public,
}

impl Privacy {
    pub fn as_str(self) -> &'static str {
        match self {
            Privacy::Private => "private",
            Privacy::Team => "team",
            Privacy::Public => "public",
        }
    }
}

impl fmt::Display for Privacy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Privacy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "private" => Ok(Privacy::Private),
            "team" => Ok(Privacy::Team),
            "public" => Ok(Privacy::Public),
            other => Err(format!("unknown privacy mode: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiChat {
    #[serde(deserialize_with = "id::deserialize")]
    pub id: String,
    pub title: String,
    #[serde(deserialize_with = "id::deserialize")]
    pub created_by: String,
    #[serde(default)]
    pub privacy: Privacy,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl AiChat {
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.created_by == user_id
    }
}

/// Message inside an AI chat; `user_id` is empty for model replies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiMessage {
    #[serde(deserialize_with = "id::deserialize")]
    pub id: String,
    #[serde(deserialize_with = "id::deserialize")]
    pub chat_id: String,
    #[serde(default, deserialize_with = "id::deserialize_opt")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub is_ai: bool,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiChatParticipant {
    #[serde(deserialize_with = "id::deserialize")]
    pub chat_id: String,
    #[serde(deserialize_with = "id::deserialize")]
    pub user_id: String,
    #[serde(default)]
    pub can_edit: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_privacy_wire_format() {
        assert_eq!(serde_json::to_value(Privacy::Team).unwrap(), "team");
        assert_eq!("Public".parse::<Privacy>().unwrap(), Privacy::Public);
    }

    #[test]
    fn test_ai_message_without_author() {
        let msg: AiMessage = serde_json::from_str(
            r#"{"id":"m1","chat_id":"c1","user_id":null,"is_ai":true,"content":"hi","created_at":"2024-03-01T10:00:00.123456+00:00"}"#,
        )
        .unwrap();
        assert!(msg.is_ai);
        assert!(msg.user_id.is_none());
    }
}
