// SPDX-FileCopyrightText: 2026 Frugal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Offline embedding adapter based on character trigram feature hashing.
//!
//! Used when no embedding model is configured. It only detects near-verbatim
//! repeats (same words, small edits), which is enough for the cache to
//! absorb repeated queries.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use frugal_core::{AdapterType, EmbeddingAdapter, FrugalError, HealthStatus, PluginAdapter, text};

use crate::similarity::l2_normalize;

/// Default vector length.
pub const DEFAULT_DIMENSIONS: usize = 256;

/// Deterministic trigram-hashing embedder.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    /// Create an embedder producing vectors of `dimensions` values (at least 1).
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    /// Embed synchronously. Blank text maps to the zero vector.
    pub fn embed_text(&self, input: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        let normalized = text::normalize(input);
        let chars: Vec<char> = normalized.chars().collect();

        if chars.is_empty() {
            return vector;
        }

        let mut gram = String::with_capacity(12);
        let width = chars.len().min(3);
        for window in chars.windows(width) {
            gram.clear();
            gram.extend(window);
            vector[self.bucket(&gram)] += 1.0;
        }

        l2_normalize(&mut vector);
        vector
    }

    fn bucket(&self, gram: &str) -> usize {
        let digest = Sha256::digest(gram.as_bytes());
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        (u64::from_le_bytes(prefix) % self.dimensions as u64) as usize
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSIONS)
    }
}

#[async_trait]
impl PluginAdapter for HashingEmbedder {
    fn name(&self) -> &str {
        "hashing"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, FrugalError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl EmbeddingAdapter for HashingEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, FrugalError> {
        Ok(self.embed_text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::cosine_similarity;

    #[test]
    fn deterministic_and_fixed_length() {
        let e = HashingEmbedder::new(64);
        let a = e.embed_text("What is Python?");
        let b = e.embed_text("What is Python?");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn case_and_spacing_do_not_matter() {
        let e = HashingEmbedder::default();
        let a = e.embed_text("What is Python?");
        let b = e.embed_text("  what IS   python? ");
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn near_duplicates_are_closer_than_unrelated_text() {
        let e = HashingEmbedder::default();
        let base = e.embed_text("How do I reverse a string in Python?");
        let near = e.embed_text("How do I reverse a string in Python");
        let far = e.embed_text("Design a globally distributed message queue");
        assert!(cosine_similarity(&base, &near) > 0.9);
        assert!(cosine_similarity(&base, &near) > cosine_similarity(&base, &far));
    }

    #[test]
    fn short_and_blank_text() {
        let e = HashingEmbedder::new(16);
        assert!(e.embed_text("   ").iter().all(|x| *x == 0.0));
        let short = e.embed_text("hi");
        let norm: f32 = short.iter().map(|x| x * x).sum();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn adapter_reports_dimensions() {
        let e = HashingEmbedder::new(32);
        assert_eq!(EmbeddingAdapter::dimensions(&e), 32);
        assert_eq!(e.embed("hello").await.unwrap().len(), 32);
        assert_eq!(e.health_check().await.unwrap(), HealthStatus::Healthy);
    }
}
