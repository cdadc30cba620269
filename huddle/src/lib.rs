//! # Huddle - realtime team chat with an AI assistant
//!
//! Huddle keeps a client-side view of channels, direct messages and AI chats
//! in sync with a hosted Postgres backend (REST + realtime change feeds +
//! object storage) and asks Gemini for replies and chat titles.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use huddle::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let mut app = AppBuilder::new()
//!         .store(StoreConfig::new("https://project.example.co", "anon-key"))
//!         .generative_key(std::env::var("GENERATIVE_API_KEY")?)
//!         .user(AuthUser::new("user-id"))
//!         .build()?;
//!
//!     app.start().await;
//!     app.chat_mut().send("Hello team!").await?;
//!
//!     let chat = app.ai_chat_mut().create_chat("Summarize our roadmap").await?;
//!     println!("{}", chat.title);
//!
//!     app.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **huddle-types**: entity models, environment, naming helpers
//! - **huddle-llm**: generative gateway (Gemini client, sessions, titles)
//! - **huddle-store**: remote data gateway (REST, realtime feeds, storage, in-memory store)
//! - **huddle-sync**: channel and AI chat synchronization hooks
//!
//! Without a store endpoint or key the app runs in degraded mode outside
//! production: hooks stay usable and show placeholder channels.

pub use huddle_llm as llm;
pub use huddle_store as store;
pub use huddle_sync as sync;
pub use huddle_types as types;

pub use huddle_llm::{Generator, GenerativeClient, GenerativeConfig};
pub use huddle_store::{MemoryStore, RemoteStore, StoreConfig};
pub use huddle_sync::{AiChatSync, ChatSync, ResourceLibrary, SyncError, SyncMode};
pub use huddle_types::{AuthUser, Environment};

pub mod builder;
pub mod config;
pub mod console;
pub mod logging;

/// Convenient prelude with commonly used types
pub mod prelude {
    pub use crate::builder::{App, AppBuilder};
    pub use crate::config::Config;
    pub use crate::types::{AiChat, AuthUser, Channel, ChannelKind, Environment, Message, Privacy};
    pub use crate::store::StoreConfig;
    pub use crate::sync::{SyncError, SyncMode};
    pub use anyhow::Result;
}
