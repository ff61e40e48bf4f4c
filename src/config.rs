use std::path::PathBuf;

use anyhow::Result;
use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::Deserialize;

use crate::chunker::ChunkStrategy;

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;
pub const DEFAULT_DIMENSIONS: usize = 768;
pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_BATCH_SIZE: usize = 5;
pub const DEFAULT_MAX_WORKERS: usize = 4;
pub const DEFAULT_MAX_RETRIES: usize = 3;
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 2;
pub const DEFAULT_STORE_PATH: &str = "docvec.store";
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Raw optional values read from `docvec.toml` / `DOCVEC_*` environment
/// variables before defaults apply.
#[derive(Deserialize)]
struct RawSettings {
    store_path: Option<String>,
    dimensions: Option<usize>,
    chunk_size: Option<usize>,
    chunk_overlap: Option<usize>,
    chunk_strategy: Option<String>,
    top_k: Option<usize>,
    batch_size: Option<usize>,
    max_workers: Option<usize>,
    max_retries: Option<usize>,
    retry_delay_secs: Option<u64>,
    log_level: Option<String>,
}

impl RawSettings {
    fn try_from(config: &Config) -> Result<Self, ConfigError> {
        Ok(RawSettings {
            store_path: config.get("store_path").ok(),
            dimensions: config.get("dimensions").ok(),
            chunk_size: config.get("chunk_size").ok(),
            chunk_overlap: config.get("chunk_overlap").ok(),
            chunk_strategy: config.get("chunk_strategy").ok(),
            top_k: config.get("top_k").ok(),
            batch_size: config.get("batch_size").ok(),
            max_workers: config.get("max_workers").ok(),
            max_retries: config.get("max_retries").ok(),
            retry_delay_secs: config.get("retry_delay_secs").ok(),
            log_level: config.get("log_level").ok(),
        })
    }
}

/// Effective settings after layering the config file, environment, and
/// defaults. Verbosity lives here so concurrent pipelines can carry
/// different levels instead of sharing process-wide mutable state.
#[derive(Debug, Clone)]
pub struct Settings {
    pub store_path: PathBuf,
    pub dimensions: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub chunk_strategy: ChunkStrategy,
    pub top_k: usize,
    pub batch_size: usize,
    pub max_workers: usize,
    pub max_retries: usize,
    pub retry_delay_secs: u64,
    pub log_level: String,
}

impl Settings {
    /// Layer `docvec.toml` (optional) and `DOCVEC_*` environment variables
    /// over the defaults.
    pub fn load() -> Result<Self> {
        let mut config = Config::default();
        #[allow(deprecated)]
        {
            config.merge(ConfigFile::with_name("docvec").required(false))?;
            config.merge(Environment::with_prefix("DOCVEC"))?;
        }

        let raw = RawSettings::try_from(&config)?;

        let chunk_strategy = raw
            .chunk_strategy
            .as_deref()
            .map(|s| s.parse::<ChunkStrategy>())
            .transpose()
            .map_err(anyhow::Error::msg)?
            .unwrap_or_default();

        let settings = Self {
            store_path: PathBuf::from(
                raw.store_path
                    .unwrap_or_else(|| DEFAULT_STORE_PATH.to_string()),
            ),
            dimensions: raw.dimensions.unwrap_or(DEFAULT_DIMENSIONS),
            chunk_size: raw.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE),
            chunk_overlap: raw.chunk_overlap.unwrap_or(DEFAULT_CHUNK_OVERLAP),
            chunk_strategy,
            top_k: raw.top_k.unwrap_or(DEFAULT_TOP_K),
            batch_size: raw.batch_size.unwrap_or(DEFAULT_BATCH_SIZE),
            max_workers: raw.max_workers.unwrap_or(DEFAULT_MAX_WORKERS),
            max_retries: raw.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            retry_delay_secs: raw.retry_delay_secs.unwrap_or(DEFAULT_RETRY_DELAY_SECS),
            log_level: raw
                .log_level
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        };

        if settings.chunk_size == 0 {
            anyhow::bail!("chunk_size must be positive");
        }
        if settings.chunk_overlap >= settings.chunk_size {
            anyhow::bail!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                settings.chunk_overlap,
                settings.chunk_size
            );
        }
        if settings.dimensions == 0 {
            anyhow::bail!("dimensions must be positive");
        }

        Ok(settings)
    }

    pub fn print_config(&self) {
        println!("store_path={}", self.store_path.display());
        println!("dimensions={}", self.dimensions);
        println!("chunk_size={}", self.chunk_size);
        println!("chunk_overlap={}", self.chunk_overlap);
        println!("chunk_strategy={}", self.chunk_strategy);
        println!("top_k={}", self.top_k);
        println!("batch_size={}", self.batch_size);
        println!("max_workers={}", self.max_workers);
        println!("max_retries={}", self.max_retries);
        println!("retry_delay_secs={}", self.retry_delay_secs);
        println!("log_level={}", self.log_level);
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            dimensions: DEFAULT_DIMENSIONS,
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            chunk_strategy: ChunkStrategy::default(),
            top_k: DEFAULT_TOP_K,
            batch_size: DEFAULT_BATCH_SIZE,
            max_workers: DEFAULT_MAX_WORKERS,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_secs: DEFAULT_RETRY_DELAY_SECS,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}
