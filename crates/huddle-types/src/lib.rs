pub mod config;
pub mod events;
pub mod models;

pub use config::Environment;
pub use events::{ChangeEvent, ChangeKind};
pub use models::{
    canonical_direct_name, derive_display_name, initials, AiChat, AiChatParticipant, AiMessage,
    AuthUser, Channel, ChannelKind, ChannelMember, MemberSummary, Message, Privacy, User,
    DIRECT_NAME_SEPARATOR,
};
