// SPDX-FileCopyrightText: 2026 Frugal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock provider adapter for deterministic testing.
//!
//! `MockProvider` implements `ProviderAdapter` with pre-configured responses,
//! enabling fast, CI-runnable tests without external model calls.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use frugal_core::{
    AdapterType, FrugalError, HealthStatus, PluginAdapter, ProviderAdapter, ProviderRequest,
    ProviderResponse, TokenUsage, text,
};

/// A mock provider that returns pre-configured responses.
///
/// Responses are popped from a FIFO queue. When the queue is empty,
/// a default "mock response" text is returned. Token usage is the word
/// count of the prompt and of the response.
pub struct MockProvider {
    responses: Arc<Mutex<VecDeque<String>>>,
    requests: Arc<Mutex<Vec<ProviderRequest>>>,
    calls: AtomicUsize,
    failure: Option<String>,
    delay: Option<Duration>,
    cost_usd: Option<f64>,
}

impl MockProvider {
    /// Create a new mock provider with an empty response queue.
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            calls: AtomicUsize::new(0),
            failure: None,
            delay: None,
            cost_usd: None,
        }
    }

    /// Create a mock provider pre-loaded with the given responses.
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::from(responses))),
            ..Self::new()
        }
    }

    /// Every invocation fails with `message`.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Report a fixed cost on every response.
    pub fn with_cost(mut self, cost_usd: f64) -> Self {
        self.cost_usd = Some(cost_usd);
        self
    }

    /// Add a response to the end of the queue.
    pub async fn add_response(&self, text: String) {
        self.responses.lock().await.push_back(text);
    }

    /// Number of invocations so far, including failed ones.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Requests received so far, in arrival order.
    pub async fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().await.clone()
    }

    /// Pop the next response, or return the default.
    async fn next_response(&self) -> String {
        self.responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| "mock response".to_string())
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockProvider {
    fn name(&self) -> &str {
        "mock-provider"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, FrugalError> {
        Ok(match &self.failure {
            Some(message) => HealthStatus::Unhealthy(message.clone()),
            None => HealthStatus::Healthy,
        })
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    async fn invoke(&self, request: ProviderRequest) -> Result<ProviderResponse, FrugalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().await.push(request.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.failure {
            return Err(FrugalError::Provider {
                message: message.clone(),
                source: None,
            });
        }

        let content = self.next_response().await;
        let usage = TokenUsage::new(
            text::word_count(&request.prompt) as u32,
            text::word_count(&content) as u32,
        );
        Ok(ProviderResponse {
            content,
            usage,
            elapsed: self.delay.unwrap_or_default(),
            cost_usd: self.cost_usd,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frugal_core::Tier;

    fn request(prompt: &str) -> ProviderRequest {
        ProviderRequest {
            provider: "mock".to_string(),
            model: "mock".to_string(),
            prompt: prompt.to_string(),
            tier: Tier::Simple,
        }
    }

    #[tokio::test]
    async fn responses_are_served_in_order_then_default() {
        let provider = MockProvider::with_responses(vec!["one".into(), "two".into()]);
        assert_eq!(provider.invoke(request("a")).await.unwrap().content, "one");
        assert_eq!(provider.invoke(request("b")).await.unwrap().content, "two");
        assert_eq!(
            provider.invoke(request("c")).await.unwrap().content,
            "mock response"
        );
        assert_eq!(provider.call_count(), 3);
        assert_eq!(provider.requests().await.len(), 3);
    }

    #[tokio::test]
    async fn usage_counts_words() {
        let provider = MockProvider::with_responses(vec!["three word answer".into()]);
        let response = provider.invoke(request("a short prompt here")).await.unwrap();
        assert_eq!(response.usage, TokenUsage::new(4, 3));
    }

    #[tokio::test]
    async fn failing_provider_errors_and_counts_calls() {
        let provider = MockProvider::new().failing("boom");
        let err = provider.invoke(request("x")).await.unwrap_err();
        assert!(err.to_string().contains("boom"));
        assert_eq!(provider.call_count(), 1);
        assert!(matches!(
            provider.health_check().await.unwrap(),
            HealthStatus::Unhealthy(_)
        ));
    }
}
