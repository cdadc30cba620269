use config::{Config as ConfigLoader, ConfigError, Environment as EnvSource, File};
use huddle_llm::{GenerationOptions, GenerativeConfig, DEFAULT_MODEL};
use huddle_store::StoreConfig;
use huddle_sync::resources::DEFAULT_BUCKET;
use huddle_types::{AuthUser, Environment};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub generative: GenerativeSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub logging: LoggingConfig,

    // Secrets (from ENV only)
    #[serde(skip)]
    pub store_url: Option<String>,
    #[serde(skip)]
    pub store_anon_key: Option<String>,
    #[serde(skip)]
    pub store_access_token: Option<String>,
    #[serde(skip)]
    pub generative_api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreSettings {
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            heartbeat_secs: default_heartbeat_secs(),
        }
    }
}

fn default_heartbeat_secs() -> u64 {
    30
}

/// Missing keys fall back to the chat sampling defaults
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenerativeSettings {
    pub model: String,
    pub base_url: Option<String>,
    pub temperature: Option<f32>,
    pub top_k: Option<u32>,
    pub top_p: Option<f32>,
    pub max_output_tokens: Option<u32>,
}

impl Default for GenerativeSettings {
    fn default() -> Self {
        let options = GenerationOptions::chat_defaults();
        Self {
            model: default_model(),
            base_url: None,
            temperature: options.temperature,
            top_k: options.top_k,
            top_p: options.top_p,
            max_output_tokens: options.max_output_tokens,
        }
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    #[serde(default = "default_bucket")]
    pub bucket: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            bucket: default_bucket(),
        }
    }
}

fn default_bucket() -> String {
    DEFAULT_BUCKET.to_string()
}

/// Signed-in user handed over by the authentication provider
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionSettings {
    pub user_id: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. config/default.toml
    /// 2. config/{HUDDLE_ENV}.toml (if HUDDLE_ENV is set)
    /// 3. HUDDLE_* environment variables (`__` separates sections)
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = ConfigLoader::builder().add_source(File::with_name("config/default").required(false));
        if let Ok(env) = std::env::var("HUDDLE_ENV") {
            builder = builder.add_source(File::with_name(&format!("config/{}", env)).required(false));
        }
        let config = builder
            .add_source(
                EnvSource::with_prefix("HUDDLE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut cfg: Config = config.try_deserialize()?;
        cfg.read_secrets(|key| std::env::var(key).ok());
        Ok(cfg)
    }

    /// Load config from a specific path (useful for testing)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let builder = ConfigLoader::builder().add_source(File::from(path.as_ref()));

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Fill the secret fields; blank values count as missing
    pub fn read_secrets(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let read = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        self.store_url = read("STORE_URL");
        self.store_anon_key = read("STORE_ANON_KEY");
        self.store_access_token = read("STORE_ACCESS_TOKEN");
        self.generative_api_key = read("GENERATIVE_API_KEY");
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            url: self.store_url.clone(),
            anon_key: self.store_anon_key.clone(),
            access_token: self.store_access_token.clone(),
            heartbeat_secs: self.store.heartbeat_secs,
        }
    }

    pub fn generative_config(&self) -> GenerativeConfig {
        GenerativeConfig {
            api_key: self.generative_api_key.clone(),
            base_url: self.generative.base_url.clone(),
            model: self.generative.model.clone(),
            options: GenerationOptions {
                temperature: self.generative.temperature,
                top_k: self.generative.top_k,
                top_p: self.generative.top_p,
                max_output_tokens: self.generative.max_output_tokens,
            },
        }
    }

    pub fn auth_user(&self) -> Option<AuthUser> {
        let id = self.session.user_id.as_deref().map(str::trim).filter(|id| !id.is_empty())?;
        let user = AuthUser::new(id);
        Some(match &self.session.email {
            Some(email) => user.with_email(email.clone()),
            None => user,
        })
    }
}
