use async_trait::async_trait;

use crate::error::{GenerativeError, Result};
use crate::traits::{GenerateRequest, GenerateResponse, GenerativeClient};

/// Stand-in used when no API key is configured.
///
/// Every call fails with [`GenerativeError::Unavailable`] instead of panicking.
#[derive(Debug, Clone)]
pub struct UnavailableClient {
    reason: String,
}

impl UnavailableClient {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl Default for UnavailableClient {
    fn default() -> Self {
        Self::new("no generative API key configured")
    }
}

#[async_trait]
impl GenerativeClient for UnavailableClient {
    async fn generate(&self, _request: GenerateRequest) -> Result<GenerateResponse> {
        Err(GenerativeError::Unavailable(self.reason.clone()))
    }

    fn is_available(&self) -> bool {
        false
    }
}
