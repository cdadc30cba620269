pub mod builder;
pub mod error;
pub mod feed;
pub mod memory;
pub mod query;
pub mod realtime;
pub mod repositories;
pub mod rest;
pub mod trait_client;
pub mod unavailable;

pub use builder::{StoreBuilder, StoreConfig};
pub use error::{Result, StoreError};
pub use feed::{event_column, ChangeFeed, FeedEvent, FeedSpec};
pub use memory::{MemoryStore, OpKind, Operation, RpcHandler};
pub use query::{Filter, Order, Query};
pub use realtime::RealtimeClient;
pub use rest::RestStore;
pub use trait_client::{ObjectStorage, RemoteStore};
pub use unavailable::UnavailableStore;
