pub mod client;
pub mod protocol;

pub use client::RealtimeClient;
pub use protocol::{parse_change, PhoenixMessage};
