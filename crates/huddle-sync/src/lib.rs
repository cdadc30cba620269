pub mod ai_chat;
pub mod chat;
pub mod error;
pub mod mode;
pub mod resources;
pub mod timeline;

pub use ai_chat::AiChatSync;
pub use chat::{placeholder_channels, ChatSync};
pub use error::{Result, SyncError};
pub use mode::SyncMode;
pub use resources::{ResourceLibrary, UploadedResource};
pub use timeline::{Timeline, TimelineEntry};
