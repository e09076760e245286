// SPDX-FileCopyrightText: 2026 Frugal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding adapter trait for vector embedding generation.

use async_trait::async_trait;

use crate::error::FrugalError;
use crate::traits::adapter::PluginAdapter;

/// Adapter that maps text to a fixed-length vector.
///
/// The semantic cache compares these vectors by cosine similarity. Every
/// call must return exactly [`dimensions`](Self::dimensions) values.
#[async_trait]
pub trait EmbeddingAdapter: PluginAdapter {
    /// Dimensionality of every vector this adapter produces.
    fn dimensions(&self) -> usize;

    /// Embed a single text. May fail or be slow; callers apply their own timeout.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, FrugalError>;
}
