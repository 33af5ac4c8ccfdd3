//! Mock provider for testing.

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{CompletionProvider, CompletionRequest, ProviderError};

/// Returns the same reply (or error) for every call and records each request.
pub struct MockProvider {
    reply: Result<String, ProviderError>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockProvider {
    /// A provider whose every completion is `text`.
    pub fn replying(text: impl Into<String>) -> Self {
        Self {
            reply: Ok(text.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A provider whose every call fails with `error`.
    pub fn failing(error: ProviderError) -> Self {
        Self {
            reply: Err(error),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far, oldest first.
    pub async fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.requests.lock().await.len()
    }
}

#[async_trait]
impl CompletionProvider for MockProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        self.requests.lock().await.push(request.clone());
        self.reply.clone()
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
