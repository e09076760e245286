// SPDX-FileCopyrightText: 2026 Frugal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock embedding adapter.
//!
//! Deterministic by default (trigram hashing), with per-text overrides so a
//! test can force two texts onto the same vector, and a switch that makes
//! every call fail.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use frugal_cache::HashingEmbedder;
use frugal_core::{AdapterType, EmbeddingAdapter, FrugalError, HealthStatus, PluginAdapter};

/// A controllable embedding adapter.
pub struct MockEmbedder {
    inner: HashingEmbedder,
    dimensions: usize,
    overrides: Mutex<HashMap<String, Vec<f32>>>,
    available: AtomicBool,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            inner: HashingEmbedder::new(dimensions),
            dimensions,
            overrides: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Return `vector` whenever exactly `text` is embedded.
    pub fn set_vector(&self, text: impl Into<String>, vector: Vec<f32>) {
        self.overrides
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(text.into(), vector);
    }

    /// Make every subsequent call fail (`false`) or succeed again (`true`).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PluginAdapter for MockEmbedder {
    fn name(&self) -> &str {
        "mock-embedder"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, FrugalError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Unhealthy("switched off".to_string()))
        }
    }
}

#[async_trait]
impl EmbeddingAdapter for MockEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, FrugalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if !self.available.load(Ordering::SeqCst) {
            return Err(FrugalError::Embedding {
                message: "mock embedder unavailable".to_string(),
                source: None,
            });
        }

        let overridden = self
            .overrides
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(text)
            .cloned();
        Ok(overridden.unwrap_or_else(|| self.inner.embed_text(text)))
    }
}
