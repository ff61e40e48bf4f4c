use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use rayon::prelude::*;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::chunker::TextChunker;
use crate::embedding::EmbeddingProvider;
use crate::error::{Error, Result};
use crate::extract::{ExtractorRegistry, TextExtractor};
use crate::metadata::{MetaValue, Metadata};
use crate::store::{SearchHit, VectorStore};

/// Outcome of a directory ingestion run.
#[derive(Debug, Default, Clone, Copy)]
pub struct IngestSummary {
    /// Documents attempted.
    pub files: usize,
    /// Documents that failed; each failure is logged, none is fatal.
    pub failed: usize,
    /// Chunks indexed across all successful documents.
    pub chunks: usize,
}

/// Orchestrates extraction, chunking, embedding, and storage. The store is
/// behind a single lock because append-and-persist is not atomic; everything
/// else is shared read-only across worker threads.
pub struct DocumentEmbedder {
    chunker: TextChunker,
    provider: Arc<dyn EmbeddingProvider>,
    extractors: ExtractorRegistry,
    store: Mutex<Box<dyn VectorStore>>,
    pool: Option<rayon::ThreadPool>,
}

impl DocumentEmbedder {
    pub fn new(
        chunker: TextChunker,
        provider: Arc<dyn EmbeddingProvider>,
        store: Box<dyn VectorStore>,
        max_workers: usize,
    ) -> Result<Self> {
        let pool = if max_workers > 1 {
            Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(max_workers)
                    .build()?,
            )
        } else {
            None
        };

        Ok(Self {
            chunker,
            provider,
            extractors: ExtractorRegistry::with_defaults(),
            store: Mutex::new(store),
            pool,
        })
    }

    /// Register an extractor for an additional file extension.
    pub fn register_extractor(&mut self, extension: &str, extractor: Arc<dyn TextExtractor>) {
        self.extractors.register(extension, extractor);
    }

    /// Process one document end to end. Returns the number of chunks
    /// indexed; a document with no extractable text indexes zero chunks and
    /// is not an error.
    pub fn process_file(&self, path: &Path) -> Result<usize> {
        info!(path = %path.display(), "processing document");

        let extractor = self.extractors.get(path)?;
        let text = extractor.extract_text(path)?;
        if text.trim().is_empty() {
            warn!(path = %path.display(), "no text extracted");
            return Ok(0);
        }

        let chunks = self.chunker.chunk_text(&text);
        if chunks.is_empty() {
            warn!(path = %path.display(), "no chunks created");
            return Ok(0);
        }
        debug!(path = %path.display(), chunks = chunks.len(), "chunked document");

        let embeddings = self.provider.embed(&chunks)?;
        if embeddings.len() != chunks.len() {
            return Err(Error::EmbeddingShape {
                expected: chunks.len(),
                got: embeddings.len(),
            });
        }

        let extraction_time = unix_time_secs();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let total_chunks = chunks.len();

        let metadata: Vec<Metadata> = chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| {
                let mut meta = Metadata::new();
                meta.insert("id".to_string(), MetaValue::from(format!("{file_name}_{i}")));
                meta.insert(
                    "source".to_string(),
                    MetaValue::from(path.display().to_string()),
                );
                meta.insert("chunk_index".to_string(), MetaValue::from(i));
                meta.insert("text".to_string(), MetaValue::from(chunk.as_str()));
                meta.insert("total_chunks".to_string(), MetaValue::from(total_chunks));
                meta.insert(
                    "extraction_time".to_string(),
                    MetaValue::Float(extraction_time),
                );
                meta
            })
            .collect();

        // One lock covers the whole append-and-persist sequence.
        self.store.lock().add_embeddings(embeddings, metadata)?;

        info!(path = %path.display(), chunks = total_chunks, "document indexed");
        Ok(total_chunks)
    }

    /// Process every supported document under `dir`. Failures are logged per
    /// file and tallied; the run itself always completes.
    pub fn process_directory(&self, dir: &Path, recursive: bool) -> Result<IngestSummary> {
        let max_depth = if recursive { usize::MAX } else { 1 };
        let files: Vec<PathBuf> = WalkDir::new(dir)
            .max_depth(max_depth)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| self.extractors.is_supported(path))
            .collect();

        if files.is_empty() {
            warn!(dir = %dir.display(), "no supported documents found");
            return Ok(IngestSummary::default());
        }
        info!(dir = %dir.display(), files = files.len(), "found documents to process");

        let tally = |path: &PathBuf| -> (usize, usize) {
            match self.process_file(path) {
                Ok(chunks) => (chunks, 0),
                Err(err) => {
                    error!(path = %path.display(), error = %err, "failed to process document");
                    (0, 1)
                }
            }
        };

        let counts: Vec<(usize, usize)> = match &self.pool {
            Some(pool) if files.len() > 1 => {
                pool.install(|| files.par_iter().map(tally).collect())
            }
            _ => files.iter().map(tally).collect(),
        };

        let mut summary = IngestSummary {
            files: files.len(),
            ..IngestSummary::default()
        };
        for (chunks, failed) in counts {
            summary.chunks += chunks;
            summary.failed += failed;
        }
        Ok(summary)
    }

    /// Embed the query text and search the store.
    pub fn search(
        &self,
        query: &str,
        top_k: usize,
        filters: Option<&Metadata>,
    ) -> Result<Vec<SearchHit>> {
        debug!(query, "embedding query");
        let mut vectors = self.provider.embed(&[query.to_string()])?;
        if vectors.len() != 1 {
            return Err(Error::EmbeddingShape {
                expected: 1,
                got: vectors.len(),
            });
        }
        let query_vector = vectors.remove(0);

        let results = self.store.lock().search(&query_vector, top_k, filters)?;
        info!(query, results = results.len(), "search complete");
        Ok(results)
    }
}

fn unix_time_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker::ChunkStrategy;
    use crate::embedding::HashEmbedder;
    use crate::store::LocalVectorStore;
    use std::fs;

    fn embedder(max_workers: usize) -> DocumentEmbedder {
        let chunker = TextChunker::new(100, 20, ChunkStrategy::Hybrid).unwrap();
        DocumentEmbedder::new(
            chunker,
            Arc::new(HashEmbedder::new(64)),
            Box::new(LocalVectorStore::new()),
            max_workers,
        )
        .unwrap()
    }

    #[test]
    fn empty_file_indexes_zero_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.txt");
        fs::write(&path, "   \n  ").unwrap();

        let pipeline = embedder(1);
        assert_eq!(pipeline.process_file(&path).unwrap(), 0);
    }

    #[test]
    fn unsupported_file_is_an_error() {
        let pipeline = embedder(1);
        let err = pipeline.process_file(Path::new("movie.mp4")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFile(_)));
    }

    #[test]
    fn metadata_records_have_the_expected_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        fs::write(&path, "Sentence one here. Sentence two follows. ".repeat(10)).unwrap();

        let pipeline = embedder(1);
        let chunks = pipeline.process_file(&path).unwrap();
        assert!(chunks > 1);

        let hits = pipeline.search("sentence one", chunks, None).unwrap();
        assert_eq!(hits.len(), chunks);
        let meta = &hits[0].metadata;
        for key in [
            "id",
            "source",
            "chunk_index",
            "text",
            "total_chunks",
            "extraction_time",
        ] {
            assert!(meta.contains_key(key), "missing {key}");
        }
        assert_eq!(meta.get("total_chunks"), Some(&MetaValue::from(chunks)));
    }

    #[test]
    fn directory_ingest_skips_unsupported_and_tallies_failures() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "Alpha document text. ".repeat(20)).unwrap();
        fs::write(dir.path().join("b.md"), "Beta document text. ".repeat(20)).unwrap();
        fs::write(dir.path().join("c.bin"), [0u8, 1, 2]).unwrap();
        // Invalid UTF-8 behind a supported extension: extraction fails.
        fs::write(dir.path().join("bad.txt"), [0xFFu8, 0xFE, 0x00]).unwrap();

        let pipeline = embedder(2);
        let summary = pipeline.process_directory(dir.path(), true).unwrap();
        assert_eq!(summary.files, 3);
        assert_eq!(summary.failed, 1);
        assert!(summary.chunks >= 2);
    }

    #[test]
    fn non_recursive_ingest_ignores_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("top.txt"), "Top level text. ".repeat(20)).unwrap();
        let sub = dir.path().join("nested");
        fs::create_dir(&sub).unwrap();
        fs::write(sub.join("deep.txt"), "Nested text. ".repeat(20)).unwrap();

        let pipeline = embedder(1);
        let summary = pipeline.process_directory(dir.path(), false).unwrap();
        assert_eq!(summary.files, 1);

        let recursive = embedder(1);
        let summary = recursive.process_directory(dir.path(), true).unwrap();
        assert_eq!(summary.files, 2);
    }

    #[test]
    fn search_filters_by_source() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        fs::write(&a, "Shared topic text about oceans. ".repeat(10)).unwrap();
        fs::write(&b, "Shared topic text about oceans. ".repeat(10)).unwrap();

        let pipeline = embedder(1);
        pipeline.process_file(&a).unwrap();
        pipeline.process_file(&b).unwrap();

        let mut filters = Metadata::new();
        filters.insert(
            "source".to_string(),
            MetaValue::from(a.display().to_string()),
        );
        let hits = pipeline.search("oceans", 50, Some(&filters)).unwrap();
        assert!(!hits.is_empty());
        for hit in &hits {
            assert_eq!(
                hit.metadata.get("source"),
                Some(&MetaValue::from(a.display().to_string()))
            );
        }
    }
}
