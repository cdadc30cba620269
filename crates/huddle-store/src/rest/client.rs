// PostgREST-style HTTP client for the hosted store (HTTP direct, no SDK)

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;

use crate::error::{Result, StoreError};
use crate::feed::{ChangeFeed, FeedSpec};
use crate::query::{filter_params, Filter, Query};
use crate::realtime::RealtimeClient;
use crate::trait_client::{ObjectStorage, RemoteStore};

const RETURN_REPRESENTATION: &str = "return=representation";

pub struct RestStore {
    http_client: reqwest::Client,
    base_url: String,
    realtime: RealtimeClient,
}

impl RestStore {
    /// Create a client; `access_token` is the signed-in user's JWT, else the anon key is sent as bearer
    pub fn new(base_url: impl Into<String>, anon_key: &str, access_token: Option<&str>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let bearer = access_token.unwrap_or(anon_key);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "apikey",
            HeaderValue::from_str(anon_key)
                .map_err(|_| StoreError::Config("Invalid store key format".to_string()))?,
        );
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", bearer))
                .map_err(|_| StoreError::Config("Invalid access token format".to_string()))?,
        );

        let http_client = reqwest::Client::builder().default_headers(headers).build()?;

        let mut realtime = RealtimeClient::new(&base_url, anon_key)?;
        if let Some(token) = access_token {
            realtime = realtime.with_access_token(token);
        }

        Ok(Self {
            http_client,
            base_url,
            realtime,
        })
    }

    pub fn with_realtime(mut self, realtime: RealtimeClient) -> Self {
        self.realtime = realtime;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    async fn read_rows(response: reqwest::Response) -> Result<Vec<Value>> {
        let response = check(response).await?;
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        match serde_json::from_str::<Value>(&body)? {
            Value::Array(rows) => Ok(rows),
            Value::Null => Ok(Vec::new()),
            row => Ok(vec![row]),
        }
    }
}

/// Turn a non-success response into a [`StoreError`]
async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let error = StoreError::from_response(status, &body);
    tracing::error!("Store request failed ({}): {}", status, error);
    Err(error)
}

#[async_trait]
impl RemoteStore for RestStore {
    async fn select(&self, table: &str, query: Query) -> Result<Vec<Value>> {
        let response = self
            .http_client
            .get(self.table_url(table))
            .query(&query.to_params())
            .send()
            .await?;
        Self::read_rows(response).await
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value> {
        let response = self
            .http_client
            .post(self.table_url(table))
            .header("Prefer", RETURN_REPRESENTATION)
            .json(&row)
            .send()
            .await?;
        Self::read_rows(response).await?.into_iter().next().ok_or_else(|| {
            StoreError::PermissionDenied(format!("Inserted row in {} is not readable", table))
        })
    }

    async fn update(&self, table: &str, filters: &[Filter], patch: Value) -> Result<Vec<Value>> {
        let response = self
            .http_client
            .patch(self.table_url(table))
            .header("Prefer", RETURN_REPRESENTATION)
            .query(&filter_params(filters))
            .json(&patch)
            .send()
            .await?;
        Self::read_rows(response).await
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<Vec<Value>> {
        let response = self
            .http_client
            .delete(self.table_url(table))
            .header("Prefer", RETURN_REPRESENTATION)
            .query(&filter_params(filters))
            .send()
            .await?;
        Self::read_rows(response).await
    }

    async fn rpc(&self, function: &str, args: Value) -> Result<Value> {
        let response = self
            .http_client
            .post(format!("{}/rest/v1/rpc/{}", self.base_url, function))
            .json(&args)
            .send()
            .await?;
        let response = check(response).await?;
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }

    async fn subscribe(&self, spec: FeedSpec) -> Result<ChangeFeed> {
        self.realtime.subscribe(spec).await
    }
}

#[async_trait]
impl ObjectStorage for RestStore {
    async fn upload(&self, bucket: &str, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<String> {
        let response = self
            .http_client
            .post(format!("{}/storage/v1/object/{}/{}", self.base_url, bucket, path))
            .header(CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await?;
        check(response).await?;
        tracing::debug!("Uploaded {}/{}", bucket, path);
        Ok(path.to_string())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/public/{}/{}", self.base_url, bucket, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_url() {
        let store = RestStore::new("https://demo.example.co/", "anon", None).unwrap();
        assert_eq!(
            store.public_url("resources", "u1/abc-notes.pdf"),
            "https://demo.example.co/storage/v1/object/public/resources/u1/abc-notes.pdf"
        );
    }

    #[test]
    fn test_invalid_key_rejected() {
        assert!(matches!(
            RestStore::new("https://demo.example.co", "bad\nkey", None),
            Err(StoreError::Config(_))
        ));
    }
}
