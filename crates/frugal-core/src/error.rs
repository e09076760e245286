// SPDX-FileCopyrightText: 2026 Frugal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Frugal router.
//!
//! [`FrugalError`] is returned by library operations. The routing path itself
//! never returns an error: embedding and cache failures are absorbed into a
//! [`Degradation`] and provider failures are carried on the decision as a
//! [`DecisionError`].

use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

/// The primary error type used across all Frugal adapter traits and core operations.
#[derive(Debug, Error)]
pub enum FrugalError {
    /// Configuration errors (invalid TOML, invalid patterns, unknown providers).
    #[error("configuration error: {0}")]
    Config(String),

    /// LLM provider errors (API failure, model not found, malformed response).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Embedding adapter errors.
    #[error("embedding error: {message}")]
    Embedding {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The semantic cache could not service the operation.
    #[error("cache error: {0}")]
    Cache(String),

    /// An embedding did not have the dimensionality the cache was built for.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Requested adapter was not found in the registry.
    #[error("adapter not found: {adapter_type}/{name}")]
    AdapterNotFound { adapter_type: String, name: String },

    /// A decision for this query id has already been recorded.
    #[error("decision for query `{query_id}` already recorded")]
    DuplicateRecord { query_id: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// A non-fatal condition that reduced the quality of a routing decision.
///
/// Degradations never abort a request. They are recorded on the decision so
/// callers and dashboards can see that a fallback path was taken.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Degradation {
    /// The classifier scanned a reduced form of the input. A tier was still produced.
    ClassificationDegraded,
    /// No embedding was available, so the cache lookup was a forced miss.
    EmbeddingUnavailable,
    /// The cache could not be consulted or updated.
    CacheUnavailable,
}

/// The failure outcome carried by an error-bearing routing decision.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecisionError {
    /// The provider returned an error or could not be resolved.
    #[error("provider `{provider}` failed: {message}")]
    ProviderInvocationFailed { provider: String, message: String },

    /// The provider did not answer within the configured timeout.
    #[error("provider `{provider}` timed out after {after:?}")]
    ProviderTimeout { provider: String, after: Duration },
}

impl DecisionError {
    /// Every decision error is an invocation failure; a timeout is a specialization.
    pub fn is_invocation_failure(&self) -> bool {
        matches!(
            self,
            Self::ProviderInvocationFailed { .. } | Self::ProviderTimeout { .. }
        )
    }

    /// Returns true for the timeout specialization.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ProviderTimeout { .. })
    }

    /// The provider that failed.
    pub fn provider(&self) -> &str {
        match self {
            Self::ProviderInvocationFailed { provider, .. } => provider,
            Self::ProviderTimeout { provider, .. } => provider,
        }
    }
}
