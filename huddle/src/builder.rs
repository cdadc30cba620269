//! Wiring of the gateways and hooks into a running app

use anyhow::{bail, Context, Result};
use std::sync::Arc;

use crate::config::Config;
use huddle_llm::{ClientFactory, GenerativeConfig, Generator};
use huddle_store::{ObjectStorage, RemoteStore, StoreBuilder, StoreConfig, UnavailableStore};
use huddle_sync::resources::DEFAULT_BUCKET;
use huddle_sync::{AiChatSync, ChatSync, ResourceLibrary, SyncMode};
use huddle_types::{AuthUser, Environment};

/// Builds an [`App`] from explicit gateway settings.
///
/// # Example
///
/// ```rust,no_run
/// use huddle::prelude::*;
///
/// # #[tokio::main]
/// # async fn main() -> Result<()> {
/// let mut app = AppBuilder::new()
///     .store(StoreConfig::new("https://project.example.co", "anon-key"))
///     .generative_key("gemini-key")
///     .user(AuthUser::new("user-id"))
///     .build()?;
/// app.start().await;
/// # Ok(())
/// # }
/// ```
pub struct AppBuilder {
    environment: Environment,
    store_config: StoreConfig,
    generative: GenerativeConfig,
    bucket: String,
    user: Option<AuthUser>,
    store: Option<(Arc<dyn RemoteStore>, Arc<dyn ObjectStorage>)>,
    generator: Option<Generator>,
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AppBuilder {
    pub fn new() -> Self {
        Self {
            environment: Environment::default(),
            store_config: StoreConfig::default(),
            generative: GenerativeConfig::default(),
            bucket: DEFAULT_BUCKET.to_string(),
            user: None,
            store: None,
            generator: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let mut builder = Self::new()
            .environment(config.environment)
            .store(config.store_config())
            .generative(config.generative_config())
            .bucket(config.storage.bucket.clone());
        builder.user = config.auth_user();
        builder
    }

    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn store(mut self, config: StoreConfig) -> Self {
        self.store_config = config;
        self
    }

    pub fn generative(mut self, config: GenerativeConfig) -> Self {
        self.generative = config;
        self
    }

    pub fn generative_key(mut self, key: impl Into<String>) -> Self {
        self.generative.api_key = Some(key.into());
        self
    }

    pub fn bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self
    }

    pub fn user(mut self, user: AuthUser) -> Self {
        self.user = Some(user);
        self
    }

    /// Use an already constructed store (e.g. an in-memory one) instead of the configured endpoint
    pub fn with_store<S>(mut self, store: Arc<S>) -> Self
    where
        S: RemoteStore + ObjectStorage + 'static,
    {
        let remote: Arc<dyn RemoteStore> = store.clone();
        let storage: Arc<dyn ObjectStorage> = store;
        self.store = Some((remote, storage));
        self
    }

    pub fn with_generator(mut self, generator: Generator) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Build the app
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the store endpoint or key is missing in production
    /// - an HTTP client cannot be constructed
    pub fn build(self) -> Result<App> {
        let (store, storage, mode) = match self.store {
            Some((store, storage)) => (store, storage, SyncMode::Live),
            None if self.store_config.is_configured() => {
                let rest = StoreBuilder::from_config(&self.store_config)
                    .build()
                    .context("Failed to create store client")?;
                let rest = Arc::new(rest);
                let remote: Arc<dyn RemoteStore> = rest.clone();
                let storage: Arc<dyn ObjectStorage> = rest;
                (remote, storage, SyncMode::Live)
            }
            None if self.environment.is_production() => {
                bail!("Store URL and anon key are required in production. Set STORE_URL and STORE_ANON_KEY")
            }
            None => {
                tracing::warn!(
                    "Store URL or anon key missing; running in degraded mode with placeholder data"
                );
                let unavailable = Arc::new(UnavailableStore::default());
                let reason = unavailable.reason().to_string();
                let remote: Arc<dyn RemoteStore> = unavailable.clone();
                let storage: Arc<dyn ObjectStorage> = unavailable;
                (remote, storage, SyncMode::degraded(reason))
            }
        };

        let generator = match self.generator {
            Some(generator) => generator,
            None => ClientFactory::create_generator(&self.generative).context("Failed to create generative client")?,
        };

        if self.user.is_none() {
            tracing::info!("No signed-in user; hooks run read-only");
        }

        Ok(App {
            environment: self.environment,
            mode,
            chat: ChatSync::new(store.clone(), self.user.clone(), self.environment),
            ai_chat: AiChatSync::new(store, generator, self.user.clone()),
            resources: ResourceLibrary::new(storage, self.bucket, self.user.clone()),
            user: self.user,
        })
    }
}

/// Hooks bound to one signed-in user
pub struct App {
    environment: Environment,
    mode: SyncMode,
    user: Option<AuthUser>,
    chat: ChatSync,
    ai_chat: AiChatSync,
    resources: ResourceLibrary,
}

impl App {
    pub fn environment(&self) -> Environment {
        self.environment
    }

    /// Mode decided at build time, or by the last channel listing
    pub fn mode(&self) -> &SyncMode {
        if self.mode.is_degraded() {
            &self.mode
        } else {
            self.chat.mode()
        }
    }

    pub fn user(&self) -> Option<&AuthUser> {
        self.user.as_ref()
    }

    pub fn chat(&self) -> &ChatSync {
        &self.chat
    }

    pub fn chat_mut(&mut self) -> &mut ChatSync {
        &mut self.chat
    }

    pub fn ai_chat(&self) -> &AiChatSync {
        &self.ai_chat
    }

    pub fn ai_chat_mut(&mut self) -> &mut AiChatSync {
        &mut self.ai_chat
    }

    /// Both hooks at once, for waiting on either feed
    pub fn hooks_mut(&mut self) -> (&mut ChatSync, &mut AiChatSync) {
        (&mut self.chat, &mut self.ai_chat)
    }

    pub fn resources(&self) -> &ResourceLibrary {
        &self.resources
    }

    /// Initial load of both hooks
    pub async fn start(&mut self) -> SyncMode {
        let mode = self.chat.load().await;
        if self.user.is_some() && !mode.is_degraded() {
            if let Err(e) = self.ai_chat.load().await {
                tracing::warn!("AI chats not loaded: {}", e);
            }
        }
        tracing::info!("Huddle started ({}, {})", self.environment, mode);
        mode
    }

    /// Close every change feed the hooks hold
    pub async fn shutdown(&mut self) {
        self.chat.dispose().await;
        self.ai_chat.dispose().await;
        tracing::info!("Huddle stopped");
    }
}
