//! End-to-end ingestion and search through the public API.

use std::fs;
use std::sync::Arc;

use docvec::{
    ChunkStrategy, DocumentEmbedder, HashEmbedder, LocalVectorStore, MetaValue, Metadata,
    RetryPolicy, RetryingEmbedder, TextChunker, VectorStore,
};

fn pipeline_with_store(store: LocalVectorStore) -> DocumentEmbedder {
    let chunker = TextChunker::new(120, 24, ChunkStrategy::Hybrid).unwrap();
    let provider = RetryingEmbedder::new(HashEmbedder::new(128), RetryPolicy::default(), 4);
    DocumentEmbedder::new(chunker, Arc::new(provider), Box::new(store), 2).unwrap()
}

#[test]
fn ingest_directory_then_search() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("rust.txt"),
        "Rust enforces memory safety through ownership and borrowing. \
         The borrow checker verifies references at compile time. "
            .repeat(5),
    )
    .unwrap();
    fs::write(
        dir.path().join("bread.md"),
        "Sourdough bread needs a mature starter and long fermentation. \
         Steam in the oven gives the crust its shine. "
            .repeat(5),
    )
    .unwrap();

    let pipeline = pipeline_with_store(LocalVectorStore::new());
    let summary = pipeline.process_directory(dir.path(), true).unwrap();
    assert_eq!(summary.files, 2);
    assert_eq!(summary.failed, 0);
    assert!(summary.chunks >= 2);

    let hits = pipeline
        .search("ownership and the borrow checker", 3, None)
        .unwrap();
    assert!(!hits.is_empty());
    let top_source = match hits[0].metadata.get("source") {
        Some(MetaValue::Str(s)) => s.clone(),
        other => panic!("unexpected source: {other:?}"),
    };
    assert!(top_source.ends_with("rust.txt"));
}

#[test]
fn filtered_search_only_returns_matching_source() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.txt");
    let b = dir.path().join("b.txt");
    fs::write(&a, "Identical content in both files. ".repeat(8)).unwrap();
    fs::write(&b, "Identical content in both files. ".repeat(8)).unwrap();

    let pipeline = pipeline_with_store(LocalVectorStore::new());
    pipeline.process_file(&a).unwrap();
    pipeline.process_file(&b).unwrap();

    let mut filters = Metadata::new();
    filters.insert(
        "source".to_string(),
        MetaValue::from(b.display().to_string()),
    );
    let hits = pipeline
        .search("identical content", 20, Some(&filters))
        .unwrap();
    assert!(!hits.is_empty());
    for hit in &hits {
        assert_eq!(
            hit.metadata.get("source"),
            Some(&MetaValue::from(b.display().to_string()))
        );
    }
}

#[test]
fn snapshot_survives_process_restart() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = dir.path().join("index.store");
    let doc = dir.path().join("doc.txt");
    fs::write(&doc, "Persistent document contents worth finding later. ".repeat(6)).unwrap();

    let indexed = {
        let pipeline = pipeline_with_store(LocalVectorStore::open(Some(snapshot.clone())));
        pipeline.process_file(&doc).unwrap()
    };
    assert!(indexed > 0);

    // A fresh store sees the snapshot; search works without re-ingesting.
    let reloaded = LocalVectorStore::open(Some(snapshot));
    assert_eq!(reloaded.len(), indexed);

    let provider = HashEmbedder::new(128);
    let query = docvec::EmbeddingProvider::embed(
        &provider,
        &["persistent document contents".to_string()],
    )
    .unwrap()
    .remove(0);
    let hits = reloaded.search(&query, 2, None).unwrap();
    assert!(!hits.is_empty());
    assert!(hits[0].similarity > 0.0);
}
