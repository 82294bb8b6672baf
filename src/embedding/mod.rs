//! Embedding generation for semantic search and retrieval.
//!
//! Corpus records and runtime queries must go through the same embedder so
//! that their vectors live in the same space. Every implementation returns
//! unit-length vectors via [`normalize`].

#[cfg(feature = "local-embeddings")]
mod local;
mod openai;

#[cfg(feature = "local-embeddings")]
pub use local::LocalEmbedder;
pub use openai::OpenAIEmbedder;

use crate::config::{EmbeddingProvider, EmbeddingSettings};
use crate::error::{GuideError, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for embedding generation.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Load the underlying model. Idempotent; `embed` calls it lazily.
    async fn load(&self) -> Result<()> {
        Ok(())
    }

    /// Whether the model has been loaded.
    fn is_loaded(&self) -> bool {
        true
    }

    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the embedding dimensions.
    fn dimensions(&self) -> usize;

    /// Model identifier, recorded for diagnostics.
    fn model_name(&self) -> &str;
}

/// Scale a vector to unit length in place. Zero vectors are left alone.
pub fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

/// Check a batch of vectors against the expected dimensionality.
pub(crate) fn check_dimensions(vectors: &[Vec<f32>], expected: usize) -> Result<()> {
    if let Some(bad) = vectors.iter().find(|v| v.len() != expected) {
        return Err(GuideError::Embedding(format!(
            "Expected {}-dimensional embeddings, got {}",
            expected,
            bad.len()
        )));
    }
    Ok(())
}

/// Build the embedder described by the settings.
pub fn create_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    match settings.provider {
        EmbeddingProvider::OpenAI => Ok(Arc::new(OpenAIEmbedder::with_config(
            &settings.model,
            settings.dimensions as usize,
        )?)),
        #[cfg(feature = "local-embeddings")]
        EmbeddingProvider::Local => Ok(Arc::new(LocalEmbedder::with_config(
            &settings.model,
            settings.dimensions as usize,
        )?)),
        #[cfg(not(feature = "local-embeddings"))]
        EmbeddingProvider::Local => Err(GuideError::Config(
            "The local embedding provider requires the `local-embeddings` feature".to_string(),
        )),
    }
}
