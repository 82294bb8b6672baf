//! In-process sentence embeddings via fastembed.
//!
//! The default model, all-MiniLM-L6-v2, mean-pools token embeddings into a
//! 384-dimensional vector. The model is downloaded and loaded on first use.

use super::{check_dimensions, normalize, Embedder};
use crate::error::{GuideError, Result};
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument};

/// Local embedder backed by an ONNX sentence-transformer.
pub struct LocalEmbedder {
    model: OnceCell<Arc<Mutex<TextEmbedding>>>,
    model_id: EmbeddingModel,
    model_name: String,
    dimensions: usize,
}

impl LocalEmbedder {
    /// all-MiniLM-L6-v2 with 384 dimensions.
    pub fn new() -> Result<Self> {
        Self::with_config("all-minilm-l6-v2", 384)
    }

    /// Create an embedder for a named model. Nothing is loaded yet.
    pub fn with_config(model: &str, dimensions: usize) -> Result<Self> {
        Ok(Self {
            model: OnceCell::new(),
            model_id: model_from_name(model)?,
            model_name: model.to_string(),
            dimensions,
        })
    }

    async fn handle(&self) -> Result<Arc<Mutex<TextEmbedding>>> {
        let handle = self
            .model
            .get_or_try_init(|| async {
                info!("Loading embedding model {}", self.model_name);
                let model_id = self.model_id.clone();
                let model = tokio::task::spawn_blocking(move || {
                    TextEmbedding::try_new(InitOptions::new(model_id).with_show_download_progress(false))
                })
                .await
                .map_err(|e| GuideError::Embedding(format!("Model loader panicked: {}", e)))?
                .map_err(|e| {
                    GuideError::Embedding(format!("Failed to initialize local embedding model: {}", e))
                })?;
                info!("Embedding model {} loaded", self.model_name);
                Ok::<_, GuideError>(Arc::new(Mutex::new(model)))
            })
            .await?;
        Ok(handle.clone())
    }
}

fn model_from_name(name: &str) -> Result<EmbeddingModel> {
    match name.to_lowercase().as_str() {
        "all-minilm-l6-v2" => Ok(EmbeddingModel::AllMiniLML6V2),
        "all-minilm-l12-v2" => Ok(EmbeddingModel::AllMiniLML12V2),
        "bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
        "bge-base-en-v1.5" => Ok(EmbeddingModel::BGEBaseENV15),
        "multilingual-e5-small" => Ok(EmbeddingModel::MultilingualE5Small),
        other => Err(GuideError::Config(format!(
            "Unknown local embedding model: {}",
            other
        ))),
    }
}

#[async_trait]
impl Embedder for LocalEmbedder {
    async fn load(&self) -> Result<()> {
        self.handle().await.map(|_| ())
    }

    fn is_loaded(&self) -> bool {
        self.model.initialized()
    }

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

        let handle = self.handle().await?;
        let texts = texts.to_vec();

        debug!("Embedding {} texts locally", texts.len());
        let mut embeddings = tokio::task::spawn_blocking(move || {
            let mut model = handle
                .lock()
                .map_err(|_| GuideError::Embedding("Embedding model lock poisoned".to_string()))?;
            model
                .embed(texts, None)
                .map_err(|e| GuideError::Embedding(format!("Local embedding failed: {}", e)))
        })
        .await
        .map_err(|e| GuideError::Embedding(format!("Embedding task panicked: {}", e)))??;

        for vector in &mut embeddings {
            normalize(vector);
        }
        check_dimensions(&embeddings, self.dimensions)?;

        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
