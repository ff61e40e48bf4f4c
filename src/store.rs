use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, error};

use crate::error::{Error, Result};
use crate::metadata::{metadata_matches, metadata_to_json, Metadata};
use crate::vector_ops::cosine_similarity;

/// One search result: the stored record's full metadata plus its cosine
/// similarity to the query.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub similarity: f32,
    pub metadata: Metadata,
}

impl SearchHit {
    /// JSON object of the metadata with an added `similarity` field.
    pub fn to_json(&self) -> serde_json::Value {
        let mut obj = metadata_to_json(&self.metadata);
        if let serde_json::Value::Object(map) = &mut obj {
            map.insert("similarity".to_string(), serde_json::json!(self.similarity));
        }
        obj
    }
}

/// Storage seam for embedding vectors. `LocalVectorStore` is the in-process
/// implementation; a remote index can stand in behind the same contract.
pub trait VectorStore: Send {
    /// Append vectors and their metadata pairwise. The two sequences must
    /// have equal length; on mismatch the store is left unchanged.
    fn add_embeddings(&mut self, embeddings: Vec<Vec<f32>>, metadata: Vec<Metadata>)
        -> Result<()>;

    /// Exact k-nearest search by cosine similarity, descending. `filters`
    /// restricts candidates to records whose metadata matches every pair.
    fn search(
        &self,
        query: &[f32],
        top_k: usize,
        filters: Option<&Metadata>,
    ) -> Result<Vec<SearchHit>>;
}

/// Brute-force in-memory vector index with an optional snapshot file.
///
/// Positions in `embeddings` and `metadata` always line up; insertion order
/// is preserved and is the only ordering guarantee outside search ranking.
/// The store has no internal locking: callers serialize `add_embeddings`,
/// and `search` must not run concurrently with a mutation.
pub struct LocalVectorStore {
    embeddings: Vec<Vec<f32>>,
    metadata: Vec<Metadata>,
    store_path: Option<PathBuf>,
}

type Snapshot = (Vec<Vec<f32>>, Vec<Metadata>);

impl LocalVectorStore {
    /// In-memory store with no backing file.
    pub fn new() -> Self {
        Self {
            embeddings: Vec::new(),
            metadata: Vec::new(),
            store_path: None,
        }
    }

    /// Open a store, loading the snapshot at `store_path` when it exists.
    /// A missing or corrupt snapshot fails open: the error is logged and the
    /// store starts empty, since an empty index is a safe default.
    pub fn open(store_path: Option<PathBuf>) -> Self {
        let mut store = Self {
            embeddings: Vec::new(),
            metadata: Vec::new(),
            store_path,
        };

        if let Some(path) = store.store_path.clone() {
            if path.exists() {
                match Self::load_snapshot(&path) {
                    Ok((embeddings, metadata)) => {
                        debug!(
                            path = %path.display(),
                            records = embeddings.len(),
                            "loaded vector store snapshot"
                        );
                        store.embeddings = embeddings;
                        store.metadata = metadata;
                    }
                    Err(err) => {
                        error!(
                            path = %path.display(),
                            error = %err,
                            "failed to load vector store snapshot, starting empty"
                        );
                    }
                }
            }
        }

        store
    }

    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }

    /// Stored metadata in insertion order.
    pub fn metadata(&self) -> &[Metadata] {
        &self.metadata
    }

    fn load_snapshot(path: &Path) -> Result<Snapshot> {
        let bytes = fs::read(path)?;
        let (embeddings, metadata): Snapshot = bincode::deserialize(&bytes)?;
        if embeddings.len() != metadata.len() {
            return Err(Error::LengthMismatch {
                embeddings: embeddings.len(),
                metadata: metadata.len(),
            });
        }
        Ok((embeddings, metadata))
    }

    /// Serialize the full state and rewrite the snapshot file.
    fn save_snapshot(&self, path: &Path) -> Result<()> {
        let bytes = bincode::serialize(&(&self.embeddings, &self.metadata))?;
        fs::write(path, bytes)?;
        debug!(
            path = %path.display(),
            records = self.embeddings.len(),
            "vector store snapshot written"
        );
        Ok(())
    }
}

impl Default for LocalVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VectorStore for LocalVectorStore {
    fn add_embeddings(
        &mut self,
        embeddings: Vec<Vec<f32>>,
        metadata: Vec<Metadata>,
    ) -> Result<()> {
        if embeddings.len() != metadata.len() {
            return Err(Error::LengthMismatch {
                embeddings: embeddings.len(),
                metadata: metadata.len(),
            });
        }

        self.embeddings.extend(embeddings);
        self.metadata.extend(metadata);

        // Durability is best-effort: a failed write must not lose the
        // in-memory result of this call.
        if let Some(path) = &self.store_path {
            if let Err(err) = self.save_snapshot(path) {
                error!(
                    path = %path.display(),
                    error = %err,
                    "failed to persist vector store snapshot"
                );
            }
        }

        Ok(())
    }

    fn search(
        &self,
        query: &[f32],
        top_k: usize,
        filters: Option<&Metadata>,
    ) -> Result<Vec<SearchHit>> {
        if self.embeddings.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(f32, usize)> = Vec::with_capacity(self.embeddings.len());
        for (i, vector) in self.embeddings.iter().enumerate() {
            if let Some(filters) = filters {
                if !metadata_matches(&self.metadata[i], filters) {
                    continue;
                }
            }
            scored.push((cosine_similarity(vector, query), i));
        }

        // Stable descending sort: ties keep insertion order, and a NaN
        // similarity (zero-norm vector) ranks below everything real.
        scored.sort_by(|a, b| cmp_similarity_desc(a.0, b.0));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(similarity, i)| SearchHit {
                similarity,
                metadata: self.metadata[i].clone(),
            })
            .collect())
    }
}

fn cmp_similarity_desc(a: f32, b: f32) -> Ordering {
    match b.partial_cmp(&a) {
        Some(ord) => ord,
        None => match (a.is_nan(), b.is_nan()) {
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            _ => Ordering::Equal,
        },
    }
}
