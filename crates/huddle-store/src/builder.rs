use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::realtime::RealtimeClient;
use crate::rest::RestStore;

/// Connection settings for the hosted store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub anon_key: Option<String>,
    /// Signed-in user's token; the anon key is used as bearer without it
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,
}

fn default_heartbeat_secs() -> u64 {
    30
}

impl StoreConfig {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            anon_key: Some(anon_key.into()),
            access_token: None,
            heartbeat_secs: default_heartbeat_secs(),
        }
    }

    /// Both endpoint and key present and non-blank
    pub fn is_configured(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.url) && present(&self.anon_key)
    }
}

pub struct StoreBuilder {
    url: Option<String>,
    anon_key: Option<String>,
    access_token: Option<String>,
    heartbeat: Duration,
}

impl StoreBuilder {
    pub fn new() -> Self {
        Self {
            url: None,
            anon_key: None,
            access_token: None,
            heartbeat: Duration::from_secs(default_heartbeat_secs()),
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        let mut builder = Self::new().heartbeat(Duration::from_secs(config.heartbeat_secs.max(1)));
        builder.url = config.url.clone();
        builder.anon_key = config.anon_key.clone();
        builder.access_token = config.access_token.clone();
        builder
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn anon_key(mut self, key: impl Into<String>) -> Self {
        self.anon_key = Some(key.into());
        self
    }

    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn heartbeat(mut self, interval: Duration) -> Self {
        self.heartbeat = interval;
        self
    }

    pub fn build(self) -> Result<RestStore> {
        let url = self
            .url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| StoreError::Unavailable("store URL is required".to_string()))?;
        let anon_key = self
            .anon_key
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| StoreError::Unavailable("store key is required".to_string()))?;
        let token = self.access_token.filter(|t| !t.trim().is_empty());

        let mut realtime = RealtimeClient::new(&url, &anon_key)?.with_heartbeat(self.heartbeat);
        if let Some(token) = &token {
            realtime = realtime.with_access_token(token.clone());
        }

        tracing::info!("Store client configured for {}", url);
        Ok(RestStore::new(url, &anon_key, token.as_deref())?.with_realtime(realtime))
    }
}

impl Default for StoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}
