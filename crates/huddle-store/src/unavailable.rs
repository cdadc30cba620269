use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Result, StoreError};
use crate::feed::{ChangeFeed, FeedSpec};
use crate::query::{Filter, Query};
use crate::trait_client::{ObjectStorage, RemoteStore};

/// Store used when no endpoint or key is configured; every call fails with
/// [`StoreError::Unavailable`] instead of reaching the network.
#[derive(Debug, Clone)]
pub struct UnavailableStore {
    reason: String,
}

impl UnavailableStore {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    fn fail<T>(&self) -> Result<T> {
        Err(StoreError::Unavailable(self.reason.clone()))
    }
}

impl Default for UnavailableStore {
    fn default() -> Self {
        Self::new("store endpoint or key not configured")
    }
}

#[async_trait]
impl RemoteStore for UnavailableStore {
    async fn select(&self, _table: &str, _query: Query) -> Result<Vec<Value>> {
        self.fail()
    }

    async fn insert(&self, _table: &str, _row: Value) -> Result<Value> {
        self.fail()
    }

    async fn update(&self, _table: &str, _filters: &[Filter], _patch: Value) -> Result<Vec<Value>> {
        self.fail()
    }

    async fn delete(&self, _table: &str, _filters: &[Filter]) -> Result<Vec<Value>> {
        self.fail()
    }

    async fn rpc(&self, _function: &str, _args: Value) -> Result<Value> {
        self.fail()
    }

    async fn subscribe(&self, _spec: FeedSpec) -> Result<ChangeFeed> {
        self.fail()
    }

    fn is_available(&self) -> bool {
        false
    }
}

#[async_trait]
impl ObjectStorage for UnavailableStore {
    async fn upload(&self, _bucket: &str, _path: &str, _bytes: Vec<u8>, _content_type: &str) -> Result<String> {
        self.fail()
    }

    fn public_url(&self, _bucket: &str, _path: &str) -> String {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_every_call_is_unavailable() {
        let store = UnavailableStore::default();
        assert!(!store.is_available());
        let err = store.select("channels", Query::new()).await.unwrap_err();
        assert!(err.is_unavailable());
        assert!(store.subscribe(FeedSpec::new("messages")).await.unwrap_err().is_unavailable());
    }
}
