use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};

/// Text-extraction collaborator. Implementations may return an empty string
/// when a document has no extractable text; the pipeline treats that as
/// "nothing to chunk" rather than an error.
pub trait TextExtractor: Send + Sync {
    fn extract_text(&self, path: &Path) -> Result<String>;
}

/// Extractor for plain-text formats: reads the file verbatim.
#[derive(Debug, Default)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract_text(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).map_err(|source| Error::Extraction {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Maps lowercase file extensions to extractors. PDF/DOCX extractors plug in
/// here without touching the pipeline.
pub struct ExtractorRegistry {
    extractors: HashMap<String, Arc<dyn TextExtractor>>,
}

impl ExtractorRegistry {
    /// Empty registry with no formats registered.
    pub fn empty() -> Self {
        Self {
            extractors: HashMap::new(),
        }
    }

    /// Registry with the built-in plain-text extractor for `.txt` and `.md`.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        let plain: Arc<dyn TextExtractor> = Arc::new(PlainTextExtractor);
        registry.register("txt", Arc::clone(&plain));
        registry.register("md", plain);
        registry
    }

    /// Register an extractor for an extension (without the leading dot).
    /// Replaces any previous registration for that extension.
    pub fn register(&mut self, extension: &str, extractor: Arc<dyn TextExtractor>) {
        self.extractors
            .insert(extension.to_ascii_lowercase(), extractor);
    }

    /// Find the extractor for a file, by extension.
    pub fn get(&self, path: &Path) -> Result<&Arc<dyn TextExtractor>> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .and_then(|ext| self.extractors.get(&ext))
            .ok_or_else(|| Error::UnsupportedFile(path.to_path_buf()))
    }

    pub fn is_supported(&self, path: &Path) -> bool {
        self.get(path).is_ok()
    }

    /// Registered extensions, sorted for stable output.
    pub fn supported_extensions(&self) -> Vec<String> {
        let mut extensions: Vec<String> = self.extractors.keys().cloned().collect();
        extensions.sort();
        extensions
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
