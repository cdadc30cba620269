mod ai_chat;
mod channel;
mod message;
mod user;

pub use ai_chat::{AiChat, AiChatParticipant, AiMessage, Privacy};
pub use channel::{canonical_direct_name, Channel, ChannelKind, ChannelMember, MemberSummary, DIRECT_NAME_SEPARATOR};
pub use message::Message;
pub use user::{derive_display_name, initials, AuthUser, User};

/// Row identifiers arrive as strings (uuid) or integers (bigserial) depending on the table
pub(crate) mod id {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn to_string<E: serde::de::Error>(value: Value) -> Result<Option<String>, E> {
        match value {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s)),
            Value::Number(n) => Ok(Some(n.to_string())),
            other => Err(E::custom(format!("invalid identifier: {}", other))),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        to_string(Value::deserialize(deserializer)?)?
            .ok_or_else(|| serde::de::Error::custom("identifier must not be null"))
    }

    pub fn deserialize_opt<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        to_string(Value::deserialize(deserializer)?)
    }
}

/// Boolean columns without a NOT NULL constraint; `null` reads as `false`
pub(crate) mod flag {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
    }
}
