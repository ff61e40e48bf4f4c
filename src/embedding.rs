use std::thread;
use std::time::Duration;

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Embedding collaborator: one vector per input text, same order. Network
/// providers batch and retry behind this seam; the store and chunker never
/// see any of that.
pub trait EmbeddingProvider: Send + Sync {
    /// Dimensionality of every vector this provider produces.
    fn dimensions(&self) -> usize;

    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Retry parameters for a flaky provider.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

/// Wraps a provider with batching and per-batch retries. Inputs are embedded
/// in batches of `batch_size`; each batch is retried up to
/// `policy.max_attempts` times with a fixed delay before the error surfaces.
pub struct RetryingEmbedder<P> {
    inner: P,
    policy: RetryPolicy,
    batch_size: usize,
}

impl<P: EmbeddingProvider> RetryingEmbedder<P> {
    pub fn new(inner: P, policy: RetryPolicy, batch_size: usize) -> Self {
        Self {
            inner,
            policy,
            batch_size: batch_size.max(1),
        }
    }

    fn embed_batch(&self, batch: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut attempt = 1;
        loop {
            match self.inner.embed(batch) {
                Ok(vectors) => {
                    if vectors.len() != batch.len() {
                        return Err(Error::EmbeddingShape {
                            expected: batch.len(),
                            got: vectors.len(),
                        });
                    }
                    return Ok(vectors);
                }
                Err(err) if attempt < self.policy.max_attempts => {
                    warn!(
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        error = %err,
                        "embedding batch failed, retrying"
                    );
                    thread::sleep(self.policy.delay);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl<P: EmbeddingProvider> EmbeddingProvider for RetryingEmbedder<P> {
    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut all = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            all.extend(self.embed_batch(batch)?);
        }
        debug!(texts = texts.len(), "embedded inputs");
        Ok(all)
    }
}

/// Deterministic offline provider: feature-hashed token counts, L2
/// normalized. No model quality, but stable vectors with the right shape,
/// which is enough for the CLI default and for tests.
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let digest = Sha256::digest(token.to_lowercase().as_bytes());
            let bucket =
                u64::from_le_bytes(digest[..8].try_into().unwrap()) as usize % self.dimensions;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in vector.iter_mut() {
                *x /= norm;
            }
        }
        vector
    }
}

impl EmbeddingProvider for HashEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn hash_embedder_is_deterministic() {
        let embedder = HashEmbedder::new(64);
        let texts = vec!["the quick brown fox".to_string()];
        let a = embedder.embed(&texts).unwrap();
        let b = embedder.embed(&texts).unwrap();
        assert_eq!(a, b);
        assert_eq!(a[0].len(), 64);
    }

    #[test]
    fn hash_embedder_returns_one_vector_per_input() {
        let embedder = HashEmbedder::new(32);
        let texts: Vec<String> = (0..7).map(|i| format!("text number {i}")).collect();
        let vectors = embedder.embed(&texts).unwrap();
        assert_eq!(vectors.len(), 7);
    }

    #[test]
    fn similar_texts_score_higher_than_unrelated() {
        let embedder = HashEmbedder::new(128);
        let texts = vec![
            "rust memory safety and ownership".to_string(),
            "rust ownership rules for memory".to_string(),
            "baking sourdough bread at home".to_string(),
        ];
        let vectors = embedder.embed(&texts).unwrap();
        let related = crate::vector_ops::cosine_similarity(&vectors[0], &vectors[1]);
        let unrelated = crate::vector_ops::cosine_similarity(&vectors[0], &vectors[2]);
        assert!(related > unrelated);
    }

    struct Flaky {
        failures: AtomicUsize,
    }

    impl EmbeddingProvider for Flaky {
        fn dimensions(&self) -> usize {
            2
        }

        fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            if self.failures.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |f| {
                if f > 0 {
                    Some(f - 1)
                } else {
                    None
                }
            }).is_ok()
            {
                return Err(Error::Embedding("transient failure".to_string()));
            }
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    #[test]
    fn retry_recovers_from_transient_failures() {
        let provider = RetryingEmbedder::new(
            Flaky {
                failures: AtomicUsize::new(2),
            },
            RetryPolicy {
                max_attempts: 3,
                delay: Duration::from_millis(1),
            },
            8,
        );
        let vectors = provider.embed(&["a".to_string()]).unwrap();
        assert_eq!(vectors.len(), 1);
    }

    #[test]
    fn retry_surfaces_error_after_exhaustion() {
        let provider = RetryingEmbedder::new(
            Flaky {
                failures: AtomicUsize::new(10),
            },
            RetryPolicy {
                max_attempts: 2,
                delay: Duration::from_millis(1),
            },
            8,
        );
        let err = provider.embed(&["a".to_string()]).unwrap_err();
        assert!(matches!(err, Error::Embedding(_)));
    }

    struct WrongShape;

    impl EmbeddingProvider for WrongShape {
        fn dimensions(&self) -> usize {
            2
        }

        fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(vec![])
        }
    }

    #[test]
    fn shape_mismatch_is_not_retried() {
        let provider = RetryingEmbedder::new(
            WrongShape,
            RetryPolicy {
                max_attempts: 3,
                delay: Duration::from_millis(1),
            },
            8,
        );
        let err = provider.embed(&["a".to_string()]).unwrap_err();
        assert!(matches!(err, Error::EmbeddingShape { .. }));
    }

    #[test]
    fn batching_preserves_input_order() {
        let embedder = RetryingEmbedder::new(HashEmbedder::new(16), RetryPolicy::default(), 2);
        let texts: Vec<String> = (0..5).map(|i| format!("input {i}")).collect();
        let batched = embedder.embed(&texts).unwrap();
        let direct = HashEmbedder::new(16).embed(&texts).unwrap();
        assert_eq!(batched, direct);
    }
}
