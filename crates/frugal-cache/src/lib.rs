// SPDX-FileCopyrightText: 2026 Frugal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semantic response cache for the Frugal router.
//!
//! Provides:
//! - [`SemanticCache`]: bounded, TTL-aware store of responses matched by cosine similarity
//! - [`HashingEmbedder`]: an offline [`EmbeddingAdapter`](frugal_core::EmbeddingAdapter)
//! - [`cosine_similarity`] and the cache key derivation

pub mod cache;
pub mod embedder;
pub mod similarity;

pub use cache::{
    CacheEntry, CacheHit, CachePolicy, CacheStats, EntrySummary, SemanticCache, cache_key,
};
pub use embedder::{DEFAULT_DIMENSIONS, HashingEmbedder};
pub use similarity::cosine_similarity;
