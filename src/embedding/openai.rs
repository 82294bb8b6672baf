//! OpenAI embeddings implementation.

use super::{check_dimensions, normalize, Embedder};
use crate::error::{GuideError, Result};
use crate::openai::create_client;
use async_openai::types::{CreateEmbeddingRequestArgs, EmbeddingInput};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// OpenAI-based embedder.
pub struct OpenAIEmbedder {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    dimensions: usize,
}

impl OpenAIEmbedder {
    /// Create a new OpenAI embedder with default settings.
    pub fn new() -> Result<Self> {
        Self::with_config("text-embedding-3-small", 384)
    }

    /// Create a new OpenAI embedder with custom model and dimensions.
    pub fn with_config(model: &str, dimensions: usize) -> Result<Self> {
        Ok(Self {
            client: create_client(None, None)?,
            model: model.to_string(),
            dimensions,
        })
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    #[instrument(skip(self, text))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| GuideError::Embedding("Empty embedding response".to_string()))
    }

    #[instrument(skip(self, texts), fields(count = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        // The API caps inputs per request
        const BATCH_SIZE: usize = 100;
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(BATCH_SIZE) {
            let request = CreateEmbeddingRequestArgs::default()
                .model(&self.model)
                .input(EmbeddingInput::StringArray(chunk.to_vec()))
                .dimensions(self.dimensions as u32)
                .build()
                .map_err(|e| GuideError::Embedding(format!("Failed to build request: {}", e)))?;

            let response = self
                .client
                .embeddings()
                .create(request)
                .await
                .map_err(|e| GuideError::OpenAI(format!("Embedding API error: {}", e)))?;

            let mut embeddings: Vec<_> = response.data.into_iter().collect();
            embeddings.sort_by_key(|e| e.index);

            for embedding_data in embeddings {
                let mut vector = embedding_data.embedding;
                normalize(&mut vector);
                all_embeddings.push(vector);
            }
        }

        if all_embeddings.len() != texts.len() {
            return Err(GuideError::Embedding(format!(
                "Requested {} embeddings, received {}",
                texts.len(),
                all_embeddings.len()
            )));
        }
        check_dimensions(&all_embeddings, self.dimensions)?;

        debug!("Generated {} embeddings", all_embeddings.len());
        Ok(all_embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedder_creation() {
        let embedder = OpenAIEmbedder::new().unwrap();
        assert_eq!(embedder.dimensions(), 384);
        assert!(embedder.is_loaded());

        let embedder = OpenAIEmbedder::with_config("text-embedding-3-large", 3072).unwrap();
        assert_eq!(embedder.dimensions(), 3072);
        assert_eq!(embedder.model_name(), "text-embedding-3-large");
    }
}
