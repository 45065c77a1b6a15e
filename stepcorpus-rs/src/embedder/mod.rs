//! Embedder client abstraction.
//!
//! Turns step text into fixed-dimension vectors. The dedup core treats the
//! vectors as opaque and only ever compares them with cosine similarity.
//!
//! # Implementations
//! - [`openai::OpenAiEmbedder`]: OpenAI embeddings API via `async-openai`.

pub mod openai;

use crate::errors::Result;

/// A vector embedding (f32 components).
pub type Embedding = Vec<f32>;

/// Trait for text-to-vector embedding clients.
///
/// Implementations must be deterministic for a given model and must return
/// one vector per input, in input order.
#[allow(async_fn_in_trait)]
pub trait EmbedderClient: Send + Sync {
    /// Generate an embedding for a single text string.
    async fn embed(&self, text: &str) -> Result<Embedding>;

    /// Generate embeddings for a batch of texts.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>>;

    /// Returns the dimensionality of embeddings produced by this client.
    fn dim(&self) -> usize;
}
