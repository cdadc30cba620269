use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::feed::{ChangeFeed, FeedSpec};
use crate::query::{Filter, Query};

/// Trait for remote table access
///
/// Rows are JSON objects. Implementations talk to a hosted backend, an
/// in-process table set, or nothing at all (degraded mode).
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Read rows matching the query
    async fn select(&self, table: &str, query: Query) -> Result<Vec<Value>>;

    /// Insert one row and return it as stored (ids and timestamps filled in)
    async fn insert(&self, table: &str, row: Value) -> Result<Value>;

    /// Patch matching rows; an empty result means nothing matched
    async fn update(&self, table: &str, filters: &[Filter], patch: Value) -> Result<Vec<Value>>;

    /// Delete matching rows; an empty result means nothing matched
    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<Vec<Value>>;

    /// Call a stored function
    async fn rpc(&self, function: &str, args: Value) -> Result<Value>;

    /// Open a change feed for one table
    async fn subscribe(&self, spec: FeedSpec) -> Result<ChangeFeed>;

    fn is_available(&self) -> bool {
        true
    }
}

/// Trait for attachment storage
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store bytes under `path` in `bucket`, returning the stored path
    async fn upload(&self, bucket: &str, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<String>;

    fn public_url(&self, bucket: &str, path: &str) -> String;
}
