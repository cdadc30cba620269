pub mod config;
pub mod error;
pub mod gemini;
pub mod generator;
pub mod session;
pub mod traits;
pub mod types;
pub mod unavailable;

pub use config::{ClientFactory, GenerativeConfig, DEFAULT_MODEL};
pub use error::{GenerativeError, Result};
pub use gemini::GeminiClient;
pub use generator::Generator;
pub use session::ChatSession;
pub use traits::{GenerateRequest, GenerateResponse, GenerationOptions, GenerativeClient, TokenUsage};
pub use types::{Role, Turn};
pub use unavailable::UnavailableClient;
