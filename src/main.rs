use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use docvec::{
    DocumentEmbedder, HashEmbedder, IngestSummary, LocalVectorStore, MetaValue, Metadata,
    RetryPolicy, RetryingEmbedder, Settings, TextChunker,
};

#[derive(Parser)]
#[command(name = "docvec")]
#[command(version = "0.1")]
#[command(about = "Chunk documents, embed them, and search by similarity", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest files or directories into the vector store
    Add {
        paths: Vec<PathBuf>,
        /// Recurse into subdirectories
        #[arg(long)]
        recursive: bool,
    },
    /// Search the store for text similar to the query
    Search {
        query: String,
        #[arg(long)]
        top_k: Option<usize>,
        /// Metadata equality filter, repeatable (e.g. --filter source=a.txt)
        #[arg(long = "filter", value_name = "KEY=VALUE")]
        filters: Vec<String>,
    },
    /// List the ids of all stored records
    List,
    /// Print the effective configuration
    Config,
}

fn build_embedder(settings: &Settings) -> Result<DocumentEmbedder> {
    let chunker = TextChunker::new(
        settings.chunk_size,
        settings.chunk_overlap,
        settings.chunk_strategy,
    )?;
    let policy = RetryPolicy {
        max_attempts: settings.max_retries,
        delay: Duration::from_secs(settings.retry_delay_secs),
    };
    let provider = RetryingEmbedder::new(
        HashEmbedder::new(settings.dimensions),
        policy,
        settings.batch_size,
    );
    let store = LocalVectorStore::open(Some(settings.store_path.clone()));

    let embedder = DocumentEmbedder::new(
        chunker,
        Arc::new(provider),
        Box::new(store),
        settings.max_workers,
    )?;
    Ok(embedder)
}

fn add_command(settings: &Settings, paths: &[PathBuf], recursive: bool) -> Result<()> {
    anyhow::ensure!(!paths.is_empty(), "no input paths given");
    let embedder = build_embedder(settings)?;

    let mut summary = IngestSummary::default();
    for path in paths {
        if path.is_dir() {
            let dir_summary = embedder.process_directory(path, recursive)?;
            summary.files += dir_summary.files;
            summary.failed += dir_summary.failed;
            summary.chunks += dir_summary.chunks;
        } else {
            summary.files += 1;
            match embedder.process_file(path) {
                Ok(chunks) => summary.chunks += chunks,
                Err(err) => {
                    summary.failed += 1;
                    eprintln!("Error processing {}: {err}", path.display());
                }
            }
        }
    }

    println!(
        "Indexed {} chunks from {} files ({} failed)",
        summary.chunks, summary.files, summary.failed
    );
    Ok(())
}

fn parse_filters(raw: &[String]) -> Result<Option<Metadata>> {
    if raw.is_empty() {
        return Ok(None);
    }
    let mut filters = Metadata::new();
    for pair in raw {
        let (key, value) = pair
            .split_once('=')
            .with_context(|| format!("filter '{pair}' is not KEY=VALUE"))?;
        filters.insert(key.to_string(), MetaValue::parse_scalar(value));
    }
    Ok(Some(filters))
}

fn search_command(
    settings: &Settings,
    query: &str,
    top_k: Option<usize>,
    raw_filters: &[String],
) -> Result<()> {
    let embedder = build_embedder(settings)?;
    let filters = parse_filters(raw_filters)?;
    let top_k = top_k.unwrap_or(settings.top_k);

    let results = embedder.search(query, top_k, filters.as_ref())?;

    let output = serde_json::json!({
        "query": query,
        "results": results.iter().map(|hit| hit.to_json()).collect::<Vec<_>>(),
        "actual_results_count": results.len(),
        "requested_results_count": top_k,
    });
    println!("{}", serde_json::to_string(&output)?);

    Ok(())
}

fn list_command(settings: &Settings) -> Result<()> {
    let store = LocalVectorStore::open(Some(settings.store_path.clone()));
    for meta in store.metadata() {
        match meta.get("id") {
            Some(MetaValue::Str(id)) => println!("{id}"),
            _ => println!("<unlabeled>"),
        }
    }
    Ok(())
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Cli::parse();
    let settings = Settings::load()?;
    init_tracing(&settings.log_level);

    match args.command {
        Commands::Add { paths, recursive } => add_command(&settings, &paths, recursive)?,
        Commands::Search {
            query,
            top_k,
            filters,
        } => search_command(&settings, &query, top_k, &filters)?,
        Commands::List => list_command(&settings)?,
        Commands::Config => settings.print_config(),
    }
    Ok(())
}
