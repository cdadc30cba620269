// Configuration layer for generative client creation

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::Result;
use crate::gemini::GeminiClient;
use crate::generator::Generator;
use crate::traits::{GenerationOptions, GenerativeClient};
use crate::unavailable::UnavailableClient;

pub const DEFAULT_MODEL: &str = "gemini-pro";

/// Configuration for the generative provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerativeConfig {
    /// Missing or empty key means the assistant runs in unavailable mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Base URL override (defaults to the public Gemini endpoint)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "GenerationOptions::chat_defaults")]
    pub options: GenerationOptions,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

impl Default for GenerativeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            model: default_model(),
            options: GenerationOptions::chat_defaults(),
        }
    }
}

impl GenerativeConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Self::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn has_credentials(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

/// Factory for creating generative clients from configuration
pub struct ClientFactory;

impl ClientFactory {
    /// Create a client; without credentials this yields an [`UnavailableClient`]
    pub fn create_client(config: &GenerativeConfig) -> Result<Arc<dyn GenerativeClient>> {
        match config.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => {
                let mut client = GeminiClient::new(key)?;
                if let Some(base_url) = &config.base_url {
                    client = client.with_base_url(base_url);
                }
                Ok(Arc::new(client))
            }
            _ => {
                tracing::warn!("Generative API key missing; AI chat runs in unavailable mode");
                Ok(Arc::new(UnavailableClient::default()))
            }
        }
    }

    /// Create a [`Generator`] bound to the configured model and sampling options
    pub fn create_generator(config: &GenerativeConfig) -> Result<Generator> {
        let client = Self::create_client(config)?;
        Ok(Generator::new(client, config.model.clone()).with_options(config.options.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_yields_unavailable_client() {
        let client = ClientFactory::create_client(&GenerativeConfig::default()).unwrap();
        assert!(!client.is_available());
    }

    #[test]
    fn test_blank_key_counts_as_missing() {
        let config = GenerativeConfig::new("   ");
        assert!(!config.has_credentials());
        let generator = ClientFactory::create_generator(&config).unwrap();
        assert!(!generator.is_available());
    }

    #[test]
    fn test_configured_key_yields_gemini() {
        let config = GenerativeConfig::new("test-key").with_model("gemini-1.5-flash");
        let generator = ClientFactory::create_generator(&config).unwrap();
        assert!(generator.is_available());
        assert_eq!(generator.model(), "gemini-1.5-flash");
    }

    #[test]
    fn test_serde_defaults() {
        let config: GenerativeConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.options.top_k, Some(40));
    }
}
