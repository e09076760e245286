// SPDX-FileCopyrightText: 2026 Frugal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Frugal router.
//!
//! This crate provides the foundational trait definitions, error types,
//! common types, and the shared tokenizer used throughout the Frugal
//! workspace. Embedding and provider adapters implement the traits
//! defined here.

pub mod error;
pub mod text;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{DecisionError, Degradation, FrugalError};
pub use types::{
    AdapterType, HealthStatus, ProviderRequest, ProviderResponse, Query, QueryId,
    RoutingDecision, Tier, TokenUsage,
};

pub use traits::{EmbeddingAdapter, PluginAdapter, ProviderAdapter};
