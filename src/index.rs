//! Named, file-scoped vector indexes persisted on disk.
//!
//! Each index lives in its own directory under the configured root:
//!
//! ```text
//! <root>/
//!   faiss_index/index.json       single-file mode
//!   faiss_index_1/index.json     two-file document mode
//!   faiss_index_2/index.json
//! ```
//!
//! `index.json` stores every chunk with its text, SHA-256 hash, and
//! embedding vector. Search is brute-force cosine similarity.
//!
//! No locking is performed. Two concurrent sessions writing the same index
//! name will race on the same directory.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use crate::embedding::{cosine_similarity, Embedder};
use crate::models::Chunk;

/// Index name used when a single file is processed.
pub const SINGLE_INDEX_NAME: &str = "faiss_index";

const INDEX_FILE: &str = "index.json";

/// Index name for the `position`-th file (0-based) in two-file document mode.
pub fn document_index_name(position: usize) -> String {
    format!("{}_{}", SINGLE_INDEX_NAME, position + 1)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

/// A searchable set of embedded chunks for one file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorIndex {
    pub name: String,
    pub model: String,
    pub dims: usize,
    pub created_at: DateTime<Utc>,
    pub entries: Vec<IndexEntry>,
}

/// One similarity search result.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub chunk_index: usize,
    pub text: String,
    pub score: f32,
}

impl VectorIndex {
    /// Pair chunks with their vectors. Fails if the counts differ or the
    /// vectors disagree on dimensionality.
    pub fn from_parts(
        name: &str,
        model: &str,
        chunks: &[Chunk],
        vectors: Vec<Vec<f32>>,
    ) -> Result<Self> {
        if chunks.len() != vectors.len() {
            bail!(
                "index {}: {} chunks but {} vectors",
                name,
                chunks.len(),
                vectors.len()
            );
        }
        let dims = vectors.first().map(|v| v.len()).unwrap_or(0);
        if vectors.iter().any(|v| v.len() != dims) {
            bail!("index {}: embedding vectors have mixed dimensions", name);
        }

        Ok(Self {
            name: name.to_string(),
            model: model.to_string(),
            dims,
            created_at: Utc::now(),
            entries: chunks
                .iter()
                .cloned()
                .zip(vectors)
                .map(|(chunk, vector)| IndexEntry { chunk, vector })
                .collect(),
        })
    }

    /// Top-`k` entries by cosine similarity, best first. Equal scores keep
    /// chunk order.
    pub fn similarity_search(&self, query: &[f32], k: usize) -> Vec<SearchHit> {
        let mut hits: Vec<SearchHit> = self
            .entries
            .iter()
            .map(|e| SearchHit {
                chunk_index: e.chunk.index,
                text: e.chunk.text.clone(),
                score: cosine_similarity(query, &e.vector),
            })
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);
        hits
    }

    fn verify(&self) -> Result<()> {
        for entry in &self.entries {
            let mut hasher = Sha256::new();
            hasher.update(entry.chunk.text.as_bytes());
            if format!("{:x}", hasher.finalize()) != entry.chunk.hash {
                bail!(
                    "index {}: chunk {} does not match its hash",
                    self.name,
                    entry.chunk.index
                );
            }
            if entry.vector.len() != self.dims {
                bail!(
                    "index {}: chunk {} has {} dims, expected {}",
                    self.name,
                    entry.chunk.index,
                    entry.vector.len(),
                    self.dims
                );
            }
        }
        Ok(())
    }
}

/// Filesystem location holding one directory per index name.
#[derive(Debug, Clone)]
pub struct IndexStore {
    root: PathBuf,
}

impl IndexStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dir_for(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.root.join(name))
    }

    /// Embed `chunks` and persist them under `name`.
    ///
    /// Any existing index with the same name is removed first, so a failed
    /// build never leaves a stale index that later loads successfully.
    pub async fn build(
        &self,
        name: &str,
        chunks: &[Chunk],
        embedder: &dyn Embedder,
    ) -> Result<VectorIndex> {
        self.remove(name).await?;

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = embedder
            .embed(&texts)
            .await
            .with_context(|| format!("Failed to embed chunks for index {}", name))?;

        let index = VectorIndex::from_parts(name, embedder.model_name(), chunks, vectors)?;
        self.save(&index).await?;

        tracing::info!(
            index = name,
            chunks = index.entries.len(),
            dims = index.dims,
            "built vector index"
        );
        Ok(index)
    }

    pub async fn save(&self, index: &VectorIndex) -> Result<()> {
        let dir = self.dir_for(&index.name)?;
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create index dir: {}", dir.display()))?;

        let data = serde_json::to_vec(index)?;
        let path = dir.join(INDEX_FILE);
        tokio::fs::write(&path, data)
            .await
            .with_context(|| format!("Failed to write index: {}", path.display()))?;
        Ok(())
    }

    pub async fn load(&self, name: &str) -> Result<VectorIndex> {
        let path = self.dir_for(name)?.join(INDEX_FILE);
        let data = tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read index: {}", path.display()))?;
        let index: VectorIndex = serde_json::from_slice(&data)
            .with_context(|| format!("Failed to parse index: {}", path.display()))?;

        if index.name != name {
            bail!("index at {} is named {}", path.display(), index.name);
        }
        index.verify()?;
        Ok(index)
    }

    pub async fn remove(&self, name: &str) -> Result<()> {
        let dir = self.dir_for(name)?;
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", dir.display())),
        }
    }
}

/// Index names become directory names and must be a single path segment.
fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !valid {
        bail!("invalid index name: {:?}", name);
    }
    Ok(())
}
