//! Embedding provider seam
//!
//! The index only needs "text in, fixed-length vector out". Keeping that
//! behind a trait lets tests swap in a deterministic provider, and pins the
//! invariant that indexing and querying must use the SAME provider:
//! embedding spaces are not comparable across models.

use anyhow::{Context, Result};
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::Mutex;

pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of texts into equal-length vectors.
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Local ONNX MiniLM embeddings via fastembed, L2-normalized.
pub struct FastembedProvider {
    model: Mutex<TextEmbedding>,
}

impl FastembedProvider {
    pub fn new() -> Result<Self> {
        let model = TextEmbedding::try_new(InitOptions::new(EmbeddingModel::AllMiniLML6V2))
            .context("Failed to initialize embedding model")?;
        Ok(Self {
            model: Mutex::new(model),
        })
    }
}

impl EmbeddingProvider for FastembedProvider {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut model = self
            .model
            .lock()
            .map_err(|_| anyhow::anyhow!("embedding model lock poisoned"))?;
        let mut embeddings = model.embed(texts.to_vec(), None)?;
        for embedding in &mut embeddings {
            normalize(embedding);
        }
        Ok(embeddings)
    }
}

pub(crate) fn normalize(vec: &mut [f32]) {
    let norm: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vec {
            *x /= norm;
        }
    }
}
