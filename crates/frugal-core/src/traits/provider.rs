// SPDX-FileCopyrightText: 2026 Frugal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider adapter trait for local and cloud model invocations.

use async_trait::async_trait;

use crate::error::FrugalError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ProviderRequest, ProviderResponse};

/// Adapter for a language-model provider.
///
/// Retry policy, if any, belongs to the implementation. The router invokes
/// each provider at most once per query.
#[async_trait]
pub trait ProviderAdapter: PluginAdapter {
    /// Sends a completion request and returns the full response.
    async fn invoke(&self, request: ProviderRequest) -> Result<ProviderResponse, FrugalError>;
}
