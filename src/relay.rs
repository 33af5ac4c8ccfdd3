//! The relay service: validates a prompt, wraps it in a single-turn
//! conversation and hands it to the completion provider.
//!
//! Every call is independent. There is no caching and no retry; two
//! identical prompts are two provider calls.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::config::ProviderConfig;
use crate::provider::{ChatMessage, CompletionProvider, CompletionRequest, ProviderError};

/// Incoming request body.
#[derive(Debug, Clone, Default)]
pub struct GenerateRequest {
    pub prompt: Option<String>,
}

impl GenerateRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: Some(prompt.into()),
        }
    }

    /// Read `prompt` from an already-parsed body. Anything other than an
    /// object with a string `prompt` carries no prompt. On duplicate keys
    /// the last one wins, as the JSON parser keeps it.
    pub fn from_json(body: &Value) -> Self {
        Self {
            prompt: body
                .get("prompt")
                .and_then(Value::as_str)
                .map(str::to_string),
        }
    }
}

/// Generated text returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionResult {
    pub content: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    #[error("No prompt provided")]
    Validation,

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl RelayError {
    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::Validation => "validation",
            RelayError::Provider(e) => e.kind(),
        }
    }
}

pub struct RelayService {
    provider: Arc<dyn CompletionProvider>,
    model: String,
    system_prompt: String,
}

impl RelayService {
    pub fn new(provider: Arc<dyn CompletionProvider>, config: &ProviderConfig) -> Self {
        Self {
            provider,
            model: config.model.clone(),
            system_prompt: config.system_prompt.clone(),
        }
    }

    pub fn provider(&self) -> &dyn CompletionProvider {
        self.provider.as_ref()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Relay one prompt. A missing or whitespace-only prompt is rejected
    /// before the provider is called; otherwise the prompt is sent verbatim.
    pub async fn generate_question(
        &self,
        request: GenerateRequest,
    ) -> Result<CompletionResult, RelayError> {
        let prompt = request
            .prompt
            .filter(|p| !p.trim().is_empty())
            .ok_or(RelayError::Validation)?;

        let completion = CompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(self.system_prompt.as_str()),
                ChatMessage::user(prompt),
            ],
        };

        let content = self.provider.complete(&completion).await?;
        Ok(CompletionResult { content })
    }
}
