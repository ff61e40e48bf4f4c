//! docvec: document chunking, embedding, and local vector similarity search.
//!
//! The core is a pure text chunker ([`chunker::TextChunker`]) and an exact
//! brute-force cosine index ([`store::LocalVectorStore`]). Text extraction
//! and embedding generation are collaborator traits so real backends (PDF
//! parsers, hosted embedding models) plug in without touching the core.

pub mod chunker;
pub mod config;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod metadata;
pub mod pipeline;
pub mod store;
pub mod vector_ops;

pub use chunker::{ChunkStrategy, TextChunker};
pub use config::Settings;
pub use embedding::{EmbeddingProvider, HashEmbedder, RetryPolicy, RetryingEmbedder};
pub use error::{Error, Result};
pub use extract::{ExtractorRegistry, PlainTextExtractor, TextExtractor};
pub use metadata::{MetaValue, Metadata};
pub use pipeline::{DocumentEmbedder, IngestSummary};
pub use store::{LocalVectorStore, SearchHit, VectorStore};
