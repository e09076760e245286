// SPDX-FileCopyrightText: 2026 Frugal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query complexity classification and cost-aware routing.
//!
//! This crate provides:
//! - [`ClassifierRules`]: heuristic complexity classification driven by configured signals
//! - [`RoutingEngine`]: classify, consult the semantic cache, invoke a provider, record cost
//!
//! Every routed query yields one [`RoutingDecision`](frugal_core::RoutingDecision),
//! including when the provider fails.

pub mod classifier;
pub mod router;

pub use classifier::{ClassifierRules, ComplexityResult};
pub use router::{RoutingEngine, RoutingEngineBuilder, RoutingSnapshot};
