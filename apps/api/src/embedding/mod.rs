//! Embedding provider boundary.
//!
//! The vectors must come from the same model that built the job index;
//! nothing here checks that.

use async_trait::async_trait;
use thiserror::Error;

pub mod chunker;
pub mod openai;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Embedding API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Provider returned {actual} embeddings for {expected} inputs")]
    CountMismatch { expected: usize, actual: usize },

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },
}

/// Pluggable embedding backend, carried in `AppState` as `Arc<dyn Embedder>`.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// One vector per input text, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    fn model(&self) -> &str;
}
