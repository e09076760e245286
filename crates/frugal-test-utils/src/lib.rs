// SPDX-FileCopyrightText: 2026 Frugal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Frugal integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockProvider`] - Mock provider with queued responses, failures and delays
//! - [`MockEmbedder`] - Deterministic embedder that can be switched off
//! - [`TestHarness`] - A routing engine wired to both

pub mod harness;
pub mod mock_embedder;
pub mod mock_provider;

pub use harness::{HARNESS_DIMENSIONS, TestHarness, TestHarnessBuilder};
pub use mock_embedder::MockEmbedder;
pub use mock_provider::MockProvider;
