//! Response caching decorator.
//!
//! The repair loop stays cache-agnostic: caching wraps any [`Generator`]
//! behind the same trait. Keys are SHA-256 over the prompt and the
//! candidate-term snapshot, so a vocabulary change invalidates naturally.

use async_trait::async_trait;
use moka::future::Cache;
use sha2::{Digest, Sha256};

use crate::error::GeneratorError;
use crate::generator::{GenerateRequest, Generator};

/// Wraps a generator with an async response cache.
pub struct CachedGenerator<G> {
    inner: G,
    cache: Cache<String, String>,
}

impl<G: Generator> CachedGenerator<G> {
    /// Wrap `inner` with a cache holding at most `capacity` responses.
    #[must_use]
    pub fn new(inner: G, capacity: u64) -> Self {
        Self {
            inner,
            cache: Cache::builder().max_capacity(capacity).build(),
        }
    }

    /// Deterministic cache key for a request.
    #[must_use]
    pub fn key_for(request: &GenerateRequest) -> String {
        let digest = Sha256::digest(request.cache_material().as_bytes());
        hex::encode(digest)
    }

    /// Number of cached responses (approximate until pending tasks flush).
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

#[async_trait]
impl<G: Generator> Generator for CachedGenerator<G> {
    async fn generate(&self, request: GenerateRequest) -> Result<String, GeneratorError> {
        let key = Self::key_for(&request);
        if let Some(hit) = self.cache.get(&key).await {
            tracing::debug!(key = %key, backend = self.inner.name(), "generator cache hit");
            return Ok(hit);
        }
        let response = self.inner.generate(request).await?;
        self.cache.insert(key, response.clone()).await;
        Ok(response)
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingGenerator {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Generator for CountingGenerator {
        async fn generate(&self, request: GenerateRequest) -> Result<String, GeneratorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("response for {}", request.prompt))
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    #[tokio::test]
    async fn repeated_request_hits_cache() {
        let cached = CachedGenerator::new(
            CountingGenerator {
                calls: AtomicUsize::new(0),
            },
            16,
        );
        let request = GenerateRequest::new("draft the cards");
        let first = cached.generate(request.clone()).await.unwrap();
        let second = cached.generate(request).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(cached.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn different_terms_miss_cache() {
        let cached = CachedGenerator::new(
            CountingGenerator {
                calls: AtomicUsize::new(0),
            },
            16,
        );
        let plain = GenerateRequest::new("repair");
        let mut with_terms = GenerateRequest::new("repair");
        with_terms.context = Some(crate::generator::PromptContext {
            candidate_terms: vec!["atm:Card".to_string()],
            ..Default::default()
        });
        cached.generate(plain).await.unwrap();
        cached.generate(with_terms).await.unwrap();
        assert_eq!(cached.inner.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn keys_are_stable() {
        let a = CachedGenerator::<CountingGenerator>::key_for(&GenerateRequest::new("x"));
        let b = CachedGenerator::<CountingGenerator>::key_for(&GenerateRequest::new("x"));
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }
}
