pub mod openai;

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{info, instrument, warn};

/// Provider-facing instruction payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledPrompt {
    pub system: String,
    pub user: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("authentication rejected: {0}")]
    Auth(String),
    #[error("no response within {0:?}")]
    Timeout(Duration),
    #[error("provider returned {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("provider returned an empty completion")]
    EmptyCompletion,
}

/// An external generative content provider. One call, one completion,
/// requested as a JSON object.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    fn name(&self) -> &str;
    async fn complete_json(&self, prompt: &CompiledPrompt) -> Result<String, ProviderError>;
}

/// Bounds every provider call with a timeout. Never retries.
#[derive(Clone)]
pub struct GenerationClient {
    provider: Arc<dyn GenerationProvider>,
    timeout: Duration,
}

impl GenerationClient {
    pub fn new(provider: Arc<dyn GenerationProvider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    /// Raw completion text, unparsed.
    #[instrument(skip(self, prompt), fields(provider = self.provider.name()))]
    pub async fn generate(&self, prompt: &CompiledPrompt) -> Result<String, ProviderError> {
        let started = Instant::now();
        let result = tokio::time::timeout(self.timeout, self.provider.complete_json(prompt)).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match result {
            Err(_) => {
                warn!(elapsed_ms, timeout = ?self.timeout, "provider call timed out");
                Err(ProviderError::Timeout(self.timeout))
            }
            Ok(Err(e)) => {
                warn!(elapsed_ms, error = %e, "provider call failed");
                Err(e)
            }
            Ok(Ok(text)) => {
                info!(elapsed_ms, bytes = text.len(), "provider call completed");
                Ok(text)
            }
        }
    }
}
