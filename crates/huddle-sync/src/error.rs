use huddle_llm::GenerativeError;
use huddle_store::StoreError;
use thiserror::Error;

/// Failure reported by a hook operation instead of a panic
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Message content is empty")]
    EmptyContent,

    #[error("Missing {0}")]
    MissingName(&'static str),

    #[error("No active {0} selected")]
    NoActiveSelection(&'static str),

    #[error("No authenticated user")]
    NotAuthenticated,

    #[error("Only the chat creator can {0}")]
    NotCreator(&'static str),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Generative(#[from] GenerativeError),

    #[error("Could not decode change event: {0}")]
    Decode(String),
}

impl SyncError {
    /// Input problems the caller can fix without retrying the backend
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SyncError::EmptyContent
                | SyncError::MissingName(_)
                | SyncError::NoActiveSelection(_)
                | SyncError::NotAuthenticated
        )
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
