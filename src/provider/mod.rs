//! Completion provider abstraction.
//!
//! - [`openai`]: OpenAI-compatible chat completion client over HTTP
//! - [`mock`]: in-process provider with a canned reply, for tests

pub mod mock;
pub mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for provider calls. The `Display` text is what callers see.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("{0}")]
    NotConfigured(String),

    #[error("Request timed out.")]
    Timeout,

    #[error("{0}")]
    Network(String),

    #[error("Error code: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),
}

impl ProviderError {
    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::NotConfigured(_) => "not_configured",
            ProviderError::Timeout => "timeout",
            ProviderError::Network(_) => "network",
            ProviderError::Api { .. } => "api",
            ProviderError::MalformedResponse(_) => "malformed_response",
        }
    }
}

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A single chat completion request, serialized as the provider's wire body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

/// Something that turns a conversation into generated text.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Request one completion and return the first choice's message text.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError>;

    /// Provider name for logs and health output.
    fn name(&self) -> &'static str;

    /// Whether the provider has what it needs to make calls.
    fn is_configured(&self) -> bool {
        true
    }
}
