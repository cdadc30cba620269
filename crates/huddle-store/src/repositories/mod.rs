pub mod ai_chat;
pub mod channel;
pub mod member;
pub mod message;
pub mod user;

pub use ai_chat::{AiChatRepository, AiMessageRepository, ParticipantRepository};
pub use channel::ChannelRepository;
pub use member::MemberRepository;
pub use message::MessageRepository;
pub use user::UserRepository;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Result;

pub const CHANNELS: &str = "channels";
pub const CHANNEL_MEMBERS: &str = "channel_members";
pub const MESSAGES: &str = "messages";
pub const USERS: &str = "users";
pub const AI_CHATS: &str = "ai_chats";
pub const AI_MESSAGES: &str = "ai_messages";
pub const AI_CHAT_PARTICIPANTS: &str = "ai_chat_participants";

pub const RPC_GET_USER_CHANNELS: &str = "get_user_channels";
pub const RPC_CREATE_CHANNEL: &str = "create_channel";
pub const RPC_CREATE_USER_CHANNEL: &str = "create_user_channel";
pub const RPC_GET_CHANNEL_MEMBERS: &str = "get_channel_members";

pub(crate) fn decode<T: DeserializeOwned>(row: Value) -> Result<T> {
    Ok(serde_json::from_value(row)?)
}

pub(crate) fn decode_all<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>> {
    rows.into_iter().map(decode).collect()
}

/// Stored functions answer with a row, a one-row array, or null
pub(crate) fn single_row(value: Value) -> Option<Value> {
    match value {
        Value::Array(rows) => rows.into_iter().next(),
        Value::Null => None,
        row => Some(row),
    }
}

/// Stored functions returning sets answer with an array (null when empty)
pub(crate) fn row_set(value: Value) -> Vec<Value> {
    match value {
        Value::Array(rows) => rows,
        Value::Null => Vec::new(),
        row => vec![row],
    }
}
