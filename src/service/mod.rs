pub mod claude;
pub mod embeddings;

pub use claude::ClaudeClient;
pub use embeddings::HfEmbeddingClient;

use async_trait::async_trait;

use crate::error::Error;

/// Text-completion collaborator behind every generation and translation call.
///
/// The response is trusted to honor the role instruction; no schema is
/// enforced beyond "non-empty string" on success.
#[async_trait]
pub trait TextService: Send + Sync {
    /// Send a role instruction plus a prompt, return the raw text response.
    async fn complete(&self, role_instruction: &str, prompt: &str) -> Result<String, Error>;
}

/// Sentence-embedding collaborator.
///
/// Order-preserving: one fixed-length vector per input string.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, Error>;
}
