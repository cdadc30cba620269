use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    /// Endpoint or key not configured; callers switch to degraded mode
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Function not found: {0}")]
    FunctionNotFound(String),

    #[error("Store API error ({status}): {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Realtime error: {0}")]
    Realtime(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
    #[serde(alias = "error")]
    error_text: Option<String>,
}

impl StoreError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }

    /// Map an HTTP error response onto the taxonomy
    pub fn from_response(status: u16, body: &str) -> Self {
        let parsed: Option<ErrorBody> = serde_json::from_str(body).ok();
        let code = parsed.as_ref().and_then(|b| b.code.clone());
        let message = parsed
            .as_ref()
            .and_then(|b| b.message.clone().or_else(|| b.error_text.clone()))
            .unwrap_or_else(|| body.to_string());

        match (status, code.as_deref()) {
            (_, Some("PGRST202")) | (_, Some("42883")) => StoreError::FunctionNotFound(message),
            (401, _) | (403, _) | (_, Some("42501")) => StoreError::PermissionDenied(message),
            (409, _) | (_, Some("23505")) => StoreError::Conflict(message),
            (404, _) => StoreError::NotFound(message),
            _ => StoreError::Api {
                status,
                code,
                message,
            },
        }
    }
}
