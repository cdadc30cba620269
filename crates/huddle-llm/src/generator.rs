use std::sync::Arc;

use crate::error::Result;
use crate::session::ChatSession;
use crate::traits::{GenerateRequest, GenerationOptions, GenerativeClient};

const TITLE_FALLBACK_CHARS: usize = 30;

/// High-level generation helpers over any [`GenerativeClient`]
#[derive(Clone)]
pub struct Generator {
    client: Arc<dyn GenerativeClient>,
    model: String,
    options: GenerationOptions,
}

impl Generator {
    pub fn new(client: Arc<dyn GenerativeClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            options: GenerationOptions::chat_defaults(),
        }
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn is_available(&self) -> bool {
        self.client.is_available()
    }

    pub fn start_session(&self) -> ChatSession {
        ChatSession::new()
    }

    /// Single-shot completion with no prior context
    pub async fn generate_response(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest::prompt(&self.model, prompt).with_options(self.options.clone());
        let response = self.client.generate(request).await.map_err(|e| {
            tracing::error!("Error generating response: {}", e);
            e
        })?;
        Ok(response.text)
    }

    /// Contextual reply; the session only records the exchange when the call succeeds
    pub async fn send_in_session(&self, session: &mut ChatSession, prompt: &str) -> Result<String> {
        let request = GenerateRequest::new(&self.model, session.turns_with(prompt))
            .with_options(self.options.clone());
        let response = self.client.generate(request).await.map_err(|e| {
            tracing::error!("Error generating session response: {}", e);
            e
        })?;
        session.record_exchange(prompt, &response.text);
        Ok(response.text)
    }

    /// Short chat title for a first prompt. Never fails: falls back to a prompt prefix.
    pub async fn generate_chat_title(&self, prompt: &str) -> String {
        let title_prompt = format!(
            "Generate a very short title (maximum 6 words) for a chat that starts with this prompt: \"{}\"",
            prompt
        );
        let request = GenerateRequest::prompt(&self.model, title_prompt).with_options(self.options.clone());

        match self.client.generate(request).await {
            Ok(response) => {
                let title = clean_title(&response.text);
                if title.is_empty() {
                    fallback_title(prompt)
                } else {
                    title
                }
            }
            Err(e) => {
                tracing::warn!("Error generating chat title, using prompt prefix: {}", e);
                fallback_title(prompt)
            }
        }
    }
}

fn clean_title(raw: &str) -> String {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix('"').unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix('"').unwrap_or(trimmed);
    trimmed.trim().to_string()
}

fn fallback_title(prompt: &str) -> String {
    let prefix: String = prompt.chars().take(TITLE_FALLBACK_CHARS).collect();
    format!("{}...", prefix)
}
