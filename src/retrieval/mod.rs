//! Vector Retrieval Index
//!
//! Embeds function descriptions and answers nearest-neighbor queries over
//! them. Three containers (descriptors, ids, embeddings) stay aligned index
//! for index; every mutation persists all three as a single blob. Search is
//! a brute-force squared-Euclidean scan parallelized with rayon.

pub mod embedder;

pub use embedder::{EmbeddingProvider, FastembedProvider};

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::catalog::FunctionDescriptor;
use crate::matcher::MatchResult;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct IndexState {
    descriptors: Vec<FunctionDescriptor>,
    ids: Vec<String>,
    embeddings: Vec<Vec<f32>>,
}

impl IndexState {
    fn len(&self) -> usize {
        self.ids.len()
    }

    /// Load-time repair: truncate to the shortest common length, and if the
    /// embeddings cannot be aligned, reset everything rather than serve an
    /// inconsistent index.
    fn repair(mut self) -> Self {
        let min_len = self.descriptors.len().min(self.ids.len());
        if self.embeddings.len() != min_len {
            warn!(
                descriptors = self.descriptors.len(),
                ids = self.ids.len(),
                embeddings = self.embeddings.len(),
                "index containers misaligned, truncating to {}",
                min_len
            );
            self.descriptors.truncate(min_len);
            self.ids.truncate(min_len);
            if self.embeddings.len() < min_len {
                warn!("embeddings list too short, resetting index");
                return Self::default();
            }
            self.embeddings.truncate(min_len);
        } else {
            self.descriptors.truncate(min_len);
            self.ids.truncate(min_len);
        }
        self
    }
}

pub struct VectorIndex {
    path: PathBuf,
    provider: Arc<dyn EmbeddingProvider>,
    state: RwLock<IndexState>,
}

impl VectorIndex {
    /// Open the index at `path`, loading any persisted blob. A missing or
    /// corrupt file yields an empty index, never an error.
    pub fn new(path: impl Into<PathBuf>, provider: Arc<dyn EmbeddingProvider>) -> Self {
        let path = path.into();
        let state = Self::load(&path);
        if state.len() > 0 {
            info!("Loaded existing index with {} vectors", state.len());
        } else {
            info!("No existing embeddings found. Starting with empty index.");
        }
        Self {
            path,
            provider,
            state: RwLock::new(state),
        }
    }

    fn load(path: &Path) -> IndexState {
        if !path.exists() {
            return IndexState::default();
        }
        let read = || -> Result<IndexState> {
            let file = File::open(path)?;
            let decoder = zstd::stream::read::Decoder::new(file)?;
            // serde_json rather than a binary codec: descriptor metadata
            // carries open JSON values (parameter defaults).
            let state: IndexState = serde_json::from_reader(decoder)?;
            Ok(state)
        };
        match read() {
            Ok(state) => state.repair(),
            Err(e) => {
                error!("Error loading vector index: {e}");
                IndexState::default()
            }
        }
    }

    /// The text a function is embedded under.
    fn embedding_text(descriptor: &FunctionDescriptor) -> String {
        let mut text = format!("{} - {}", descriptor.name, descriptor.docstring);
        if !descriptor.keywords.is_empty() {
            text.push_str(&format!(" Keywords: {}", descriptor.keywords.join(", ")));
        }
        text
    }

    /// Insert or replace a function's descriptor and embedding, then persist
    /// the full aligned state. Returns the function id.
    pub async fn upsert(&self, descriptor: FunctionDescriptor) -> Result<String> {
        let text = Self::embedding_text(&descriptor);
        let embedding = self
            .provider
            .embed(&[text])?
            .into_iter()
            .next()
            .context("embedding provider returned no vector")?;

        let id = descriptor.id.clone();
        let snapshot = {
            let mut state = self.state.write().await;
            match state.ids.iter().position(|existing| *existing == id) {
                Some(idx) => {
                    info!("Updating existing function: {id}");
                    state.descriptors[idx] = descriptor;
                    state.embeddings[idx] = embedding;
                }
                None => {
                    info!("Adding new function: {id}");
                    state.descriptors.push(descriptor);
                    state.ids.push(id.clone());
                    state.embeddings.push(embedding);
                }
            }
            debug_assert!(
                state.descriptors.len() == state.ids.len()
                    && state.ids.len() == state.embeddings.len()
            );
            state.clone()
        };

        // The in-memory index stays authoritative if the disk write fails.
        if let Err(e) = self.persist(snapshot).await {
            error!("Error saving vector index: {e}");
        }
        Ok(id)
    }

    async fn persist(&self, state: IndexState) -> Result<()> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            // Write the whole blob to a sibling temp file, then rename it
            // into place so readers only ever see a complete index.
            let tmp = path.with_extension("tmp");
            {
                let file = File::create(&tmp)?;
                let writer = BufWriter::new(file);
                let mut encoder = zstd::stream::write::Encoder::new(writer, 3)?;
                serde_json::to_writer(&mut encoder, &state)?;
                encoder.finish()?;
            }
            std::fs::rename(&tmp, &path)?;
            Ok(())
        })
        .await?
        .context("Failed to persist vector index")?;
        Ok(())
    }

    /// Nearest neighbors of the query by squared Euclidean distance, best
    /// first, each scored `1 / (1 + distance)`. An empty index returns an
    /// empty result.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<MatchResult>> {
        {
            let state = self.state.read().await;
            if state.len() == 0 {
                return Ok(Vec::new());
            }
        }

        let query_embedding = self
            .provider
            .embed(&[query.to_string()])?
            .into_iter()
            .next()
            .context("embedding provider returned no vector")?;

        let state = self.state.read().await;
        let mut scored: Vec<(f32, usize)> = state
            .embeddings
            .par_iter()
            .enumerate()
            .map(|(idx, embedding)| (squared_distance(&query_embedding, embedding), idx))
            .collect();
        scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(k.min(state.len()))
            .map(|(distance, idx)| {
                MatchResult::from_descriptor(&state.descriptors[idx], 1.0 / (1.0 + distance))
            })
            .collect())
    }

    pub async fn count(&self) -> usize {
        self.state.read().await.len()
    }
}

fn squared_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::derive_keywords;
    use tempfile::tempdir;

    /// Deterministic provider: maps known words onto fixed axes so distances
    /// are predictable without a model download.
    pub(crate) struct StubProvider;

    impl EmbeddingProvider for StubProvider {
        fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|text| {
                    let text = text.to_lowercase();
                    let mut v = vec![0.0f32; 4];
                    for (axis, word) in ["cpu", "memory", "disk", "browser"].iter().enumerate() {
                        if text.contains(word) {
                            v[axis] = 1.0;
                        }
                    }
                    embedder::normalize(&mut v);
                    v
                })
                .collect())
        }
    }

    fn descriptor(name: &str, docstring: &str) -> FunctionDescriptor {
        FunctionDescriptor {
            id: format!("automation.{}", name),
            name: name.to_string(),
            module: "automation".to_string(),
            docstring: docstring.to_string(),
            keywords: derive_keywords(name, docstring),
            parameters: Vec::new(),
        }
    }

    #[tokio::test]
    async fn empty_index_returns_no_results() {
        let dir = tempdir().unwrap();
        let index = VectorIndex::new(dir.path().join("functions.idx"), Arc::new(StubProvider));
        assert!(index.search("anything", 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn nearest_neighbor_ranks_by_distance() {
        let dir = tempdir().unwrap();
        let index = VectorIndex::new(dir.path().join("functions.idx"), Arc::new(StubProvider));
        index
            .upsert(descriptor("get_cpu_usage", "Report cpu load."))
            .await
            .unwrap();
        index
            .upsert(descriptor("get_memory_usage", "Report memory load."))
            .await
            .unwrap();

        let hits = index.search("how busy is the cpu", 3).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].name, "get_cpu_usage");
        assert!(hits[0].relevance_score > hits[1].relevance_score);
        assert!(hits[0].relevance_score > 0.0 && hits[0].relevance_score <= 1.0);
    }

    #[tokio::test]
    async fn upsert_same_id_replaces_without_growing() {
        let dir = tempdir().unwrap();
        let index = VectorIndex::new(dir.path().join("functions.idx"), Arc::new(StubProvider));

        index
            .upsert(descriptor("get_cpu_usage", "Report cpu load."))
            .await
            .unwrap();
        index
            .upsert(descriptor("get_cpu_usage", "Report memory pressure instead."))
            .await
            .unwrap();

        assert_eq!(index.count().await, 1);
        let hits = index.search("memory pressure", 1).await.unwrap();
        assert!(hits[0].docstring.contains("memory pressure"));
    }

    #[tokio::test]
    async fn index_survives_a_restart() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("functions.idx");
        {
            let index = VectorIndex::new(&path, Arc::new(StubProvider));
            index
                .upsert(descriptor("get_disk_usage", "Report disk capacity."))
                .await
                .unwrap();
        }

        let reopened = VectorIndex::new(&path, Arc::new(StubProvider));
        assert_eq!(reopened.count().await, 1);
        let hits = reopened.search("disk space", 1).await.unwrap();
        assert_eq!(hits[0].name, "get_disk_usage");
    }

    #[tokio::test]
    async fn corrupt_blob_falls_back_to_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("functions.idx");
        std::fs::write(&path, b"not a zstd frame").unwrap();

        let index = VectorIndex::new(&path, Arc::new(StubProvider));
        assert_eq!(index.count().await, 0);
    }

    #[test]
    fn repair_truncates_misaligned_containers() {
        let state = IndexState {
            descriptors: vec![
                descriptor("a", "First."),
                descriptor("b", "Second."),
                descriptor("c", "Third."),
            ],
            ids: vec!["automation.a".into(), "automation.b".into()],
            embeddings: vec![vec![0.0; 4]; 3],
        };
        let repaired = state.repair();
        assert_eq!(repaired.descriptors.len(), 2);
        assert_eq!(repaired.ids.len(), 2);
        assert_eq!(repaired.embeddings.len(), 2);
    }

    #[test]
    fn repair_resets_when_embeddings_cannot_align() {
        let state = IndexState {
            descriptors: vec![descriptor("a", "First."), descriptor("b", "Second.")],
            ids: vec!["automation.a".into(), "automation.b".into()],
            embeddings: vec![vec![0.0; 4]],
        };
        let repaired = state.repair();
        assert_eq!(repaired.descriptors.len(), 0);
        assert_eq!(repaired.ids.len(), 0);
        assert_eq!(repaired.embeddings.len(), 0);
    }

    #[test]
    fn embedding_text_includes_keywords_only_when_present() {
        let with = descriptor("get_cpu_usage", "Get the current CPU usage percentage.");
        assert!(VectorIndex::embedding_text(&with).contains("Keywords:"));

        let mut without = descriptor("x", "");
        without.keywords.clear();
        assert!(!VectorIndex::embedding_text(&without).contains("Keywords:"));
    }
}
