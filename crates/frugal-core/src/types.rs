// SPDX-FileCopyrightText: 2026 Frugal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared across the Frugal workspace.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::{DecisionError, Degradation};

/// Opaque identifier for a routed query.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryId(pub String);

impl QueryId {
    /// Generate a fresh random identifier.
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for QueryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for QueryId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for QueryId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// An incoming request: text plus an identifier and per-request overrides.
///
/// Immutable once constructed; the builder methods consume and return `self`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub id: QueryId,
    pub text: String,
    /// Bypass the cache lookup. A successful response is still cached.
    #[serde(default)]
    pub skip_cache: bool,
    /// Serve this query from the named provider regardless of tier.
    #[serde(default)]
    pub force_provider: Option<String>,
}

impl Query {
    /// Create a query with a random identifier.
    pub fn new(text: impl Into<String>) -> Self {
        Self::with_id(QueryId::random(), text)
    }

    pub fn with_id(id: impl Into<QueryId>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            skip_cache: false,
            force_provider: None,
        }
    }

    pub fn skip_cache(mut self) -> Self {
        self.skip_cache = true;
        self
    }

    pub fn force_provider(mut self, provider: impl Into<String>) -> Self {
        self.force_provider = Some(provider.into());
        self
    }
}

/// Complexity verdict assigned by the classifier.
///
/// Ordered: `Simple < Medium < Complex`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Simple,
    Medium,
    Complex,
}

impl Tier {
    /// All tiers in ascending order.
    pub const ALL: [Tier; 3] = [Tier::Simple, Tier::Medium, Tier::Complex];
}

/// Token counts for one provider invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    pub fn total(&self) -> u32 {
        self.input_tokens.saturating_add(self.output_tokens)
    }
}

/// A request handed to a provider adapter.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    /// Configured provider id, e.g. `ollama/llama3.2`.
    pub provider: String,
    /// Model name the provider should run.
    pub model: String,
    pub prompt: String,
    pub tier: Tier,
}

/// A complete response from a provider adapter.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub content: String,
    pub usage: TokenUsage,
    /// Provider-reported wall time.
    pub elapsed: Duration,
    /// Provider-reported cost in USD. When absent the pricing table is used.
    pub cost_usd: Option<f64>,
}

/// The single outcome record produced for every routed query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub query_id: QueryId,
    pub tier: Tier,
    pub was_cache_hit: bool,
    /// Cosine similarity of the matched entry, on a hit.
    pub cache_similarity: Option<f32>,
    pub provider_selected: String,
    /// Absent when the decision carries an error.
    pub response_text: Option<String>,
    pub usage: TokenUsage,
    pub actual_cost_usd: f64,
    pub baseline_cost_usd: f64,
    /// End-to-end time spent producing this decision.
    pub latency: Duration,
    /// Provider-reported elapsed time, on a miss.
    pub provider_elapsed: Option<Duration>,
    pub degradations: Vec<Degradation>,
    pub error: Option<DecisionError>,
    pub created_at: DateTime<Utc>,
}

impl RoutingDecision {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Baseline minus actual cost.
    pub fn savings_usd(&self) -> f64 {
        self.baseline_cost_usd - self.actual_cost_usd
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the type of adapter in the registry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Provider,
    Embedding,
}
