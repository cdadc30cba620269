use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerativeError {
    /// No API key configured; callers should treat the assistant as offline
    #[error("Generative service unavailable: {0}")]
    Unavailable(String),

    #[error("Generative API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Response blocked by safety filters: {0}")]
    Blocked(String),

    #[error("Model returned an empty response")]
    EmptyResponse,

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, GenerativeError>;
