// SPDX-FileCopyrightText: 2026 Frugal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end routing tests.
//!
//! `TestHarness` assembles a complete routing engine with a mock provider
//! registered under every mapped provider id and a mock embedder in front of
//! the semantic cache.

use std::sync::Arc;
use std::time::Duration;

use frugal_config::model::FrugalConfig;
use frugal_core::{FrugalError, Query, RoutingDecision};
use frugal_router::RoutingEngine;

use crate::mock_embedder::MockEmbedder;
use crate::mock_provider::MockProvider;

/// Dimensionality of the harness embedder.
pub const HARNESS_DIMENSIONS: usize = 64;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: FrugalConfig,
    responses: Vec<String>,
    failure: Option<String>,
    provider_delay: Option<Duration>,
    embedder_delay: Option<Duration>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            config: FrugalConfig::default(),
            responses: Vec::new(),
            failure: None,
            provider_delay: None,
            embedder_delay: None,
        }
    }

    /// Start from a custom configuration.
    pub fn with_config(mut self, config: FrugalConfig) -> Self {
        self.config = config;
        self
    }

    /// Set mock provider responses.
    pub fn with_mock_responses(mut self, responses: Vec<String>) -> Self {
        self.responses = responses;
        self
    }

    /// Make every provider invocation fail.
    pub fn with_provider_failure(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    pub fn with_provider_delay(mut self, delay: Duration) -> Self {
        self.provider_delay = Some(delay);
        self
    }

    pub fn with_embedder_delay(mut self, delay: Duration) -> Self {
        self.embedder_delay = Some(delay);
        self
    }

    /// Build the harness and its engine.
    pub fn build(self) -> Result<TestHarness, FrugalError> {
        let mut provider = MockProvider::with_responses(self.responses);
        if let Some(message) = self.failure {
            provider = provider.failing(message);
        }
        if let Some(delay) = self.provider_delay {
            provider = provider.with_delay(delay);
        }
        let mock_provider = Arc::new(provider);

        let mut embedder = MockEmbedder::new(HARNESS_DIMENSIONS);
        if let Some(delay) = self.embedder_delay {
            embedder = embedder.with_delay(delay);
        }
        let mock_embedder = Arc::new(embedder);

        let mut config = self.config;
        config.cache.dimensions = Some(HARNESS_DIMENSIONS);

        let routing = &config.routing;
        let mut ids = vec![
            routing.simple_provider.clone(),
            routing.medium_provider.clone(),
            routing.complex_provider.clone(),
        ];
        ids.extend(routing.force_provider.clone());
        ids.sort();
        ids.dedup();

        let mut builder = RoutingEngine::builder(config.clone()).embedder(mock_embedder.clone());
        for id in ids {
            builder = builder.provider(id, mock_provider.clone());
        }
        let engine = Arc::new(builder.build()?);

        Ok(TestHarness {
            engine,
            mock_provider,
            mock_embedder,
            config,
        })
    }
}

/// A routing engine wired to mock adapters.
pub struct TestHarness {
    pub engine: Arc<RoutingEngine>,
    /// Registered under every mapped provider id.
    pub mock_provider: Arc<MockProvider>,
    pub mock_embedder: Arc<MockEmbedder>,
    /// The configuration the engine was built from.
    pub config: FrugalConfig,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Route a text with a fresh query id.
    pub async fn route(&self, text: &str) -> RoutingDecision {
        self.engine.route(Query::new(text)).await
    }
}
