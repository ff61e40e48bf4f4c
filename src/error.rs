use std::path::PathBuf;

use thiserror::Error;

/// Result alias for docvec operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the chunker, store, and pipeline.
///
/// Configuration and caller-contract violations (`InvalidChunking`,
/// `LengthMismatch`, `UnsupportedFile`) are raised synchronously. Persistence
/// failures are never surfaced through `add_embeddings`; the store logs and
/// absorbs them so the in-memory state stays authoritative.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid chunking parameters: chunk_size={chunk_size}, overlap={overlap}")]
    InvalidChunking { chunk_size: usize, overlap: usize },

    #[error("embeddings/metadata length mismatch: {embeddings} embeddings, {metadata} metadata")]
    LengthMismatch { embeddings: usize, metadata: usize },

    #[error("no extractor registered for '{}'", .0.display())]
    UnsupportedFile(PathBuf),

    #[error("failed to extract text from '{}'", .path.display())]
    Extraction {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("embedding provider error: {0}")]
    Embedding(String),

    #[error("embedding provider returned {got} vectors for {expected} inputs")]
    EmbeddingShape { expected: usize, got: usize },

    #[error("snapshot serialization error: {0}")]
    Snapshot(#[from] bincode::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}
