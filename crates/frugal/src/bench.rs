// SPDX-FileCopyrightText: 2026 Frugal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Offline routing benchmark.
//!
//! Routes a fixed corpus of simple, medium and complex queries through a
//! real engine with the hashing embedder and a simulated provider. The first
//! round bypasses the cache lookup; later rounds repeat the corpus and should
//! be answered from the cache.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use serde::Serialize;
use tracing::info;

use frugal_cache::CacheStats;
use frugal_config::model::FrugalConfig;
use frugal_core::{
    AdapterType, FrugalError, HealthStatus, PluginAdapter, ProviderAdapter, ProviderRequest,
    ProviderResponse, Query, RoutingDecision, Tier, TokenUsage, text,
};
use frugal_cost::LedgerSummary;
use frugal_router::RoutingEngine;

/// Benchmark queries with the tier a human would assign them.
pub const CORPUS: &[(&str, Tier)] = &[
    ("What is Python?", Tier::Simple),
    ("Convert 100 USD to EUR", Tier::Simple),
    ("What's 15% of 230?", Tier::Simple),
    ("What is the capital of France?", Tier::Simple),
    ("How many days are in a year?", Tier::Simple),
    ("What color is the sky?", Tier::Simple),
    ("Who wrote Romeo and Juliet?", Tier::Simple),
    ("What is 2 + 2?", Tier::Simple),
    ("Define machine learning in one sentence", Tier::Simple),
    ("What year did World War 2 end?", Tier::Simple),
    ("Explain the difference between REST and GraphQL APIs", Tier::Medium),
    ("Write a function to reverse a string in Python", Tier::Medium),
    ("What are the pros and cons of using Redis vs Memcached?", Tier::Medium),
    ("How does Python's garbage collection work?", Tier::Medium),
    ("Explain the concept of polymorphism in OOP", Tier::Medium),
    ("What is the difference between SQL and NoSQL databases?", Tier::Medium),
    ("How do you handle exceptions in Python?", Tier::Medium),
    ("Explain the MVC architecture pattern", Tier::Medium),
    ("What are environment variables and why are they useful?", Tier::Medium),
    ("Describe the difference between threads and processes", Tier::Medium),
    (
        "Design a distributed cache system for a social media platform that handles 10 million \
         requests per second with low latency and high availability",
        Tier::Complex,
    ),
    (
        "Explain how transformer attention mechanisms work, including multi-head attention, and \
         compare them to RNN-based sequence models",
        Tier::Complex,
    ),
    (
        "Design a URL shortening service like bit.ly that can handle 100M daily users. Include \
         database schema, API design, and scaling considerations",
        Tier::Complex,
    ),
    (
        "Analyze the trade-offs between eventual consistency and strong consistency in \
         distributed systems, with examples of when to use each",
        Tier::Complex,
    ),
    (
        "Explain how to implement a rate limiter using the token bucket algorithm, including \
         handling distributed environments",
        Tier::Complex,
    ),
    (
        "Design a recommendation system for an e-commerce platform. Include data collection, \
         model architecture, and real-time serving considerations",
        Tier::Complex,
    ),
    (
        "How would you debug a memory leak in a production Python application? Walk through \
         your systematic approach",
        Tier::Complex,
    ),
    (
        "Design a real-time collaborative text editor like Google Docs. Address conflict \
         resolution and synchronization",
        Tier::Complex,
    ),
];

/// Provider stand-in that answers instantly and reports a plausible latency.
pub struct SimulatedProvider;

impl SimulatedProvider {
    fn reported_latency(tier: Tier) -> Duration {
        match tier {
            Tier::Simple => Duration::from_millis(150),
            Tier::Medium => Duration::from_millis(600),
            Tier::Complex => Duration::from_millis(2_400),
        }
    }
}

#[async_trait]
impl PluginAdapter for SimulatedProvider {
    fn name(&self) -> &str {
        "simulated"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, FrugalError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl ProviderAdapter for SimulatedProvider {
    async fn invoke(&self, request: ProviderRequest) -> Result<ProviderResponse, FrugalError> {
        let content = format!(
            "[{}] simulated {} answer covering {} words of input.",
            request.model,
            request.tier,
            text::word_count(&request.prompt)
        );
        let usage = TokenUsage::new(
            text::count_tokens(&request.prompt),
            text::count_tokens(&content),
        );
        Ok(ProviderResponse {
            content,
            usage,
            elapsed: Self::reported_latency(request.tier),
            cost_usd: None,
        })
    }
}

/// Benchmark outcome, printed as JSON.
#[derive(Debug, Serialize)]
pub struct BenchReport {
    pub rounds: usize,
    pub requests: usize,
    /// Share of decisions whose tier matched the corpus label, in percent.
    pub routing_accuracy_pct: f64,
    pub avg_hit_latency_us: f64,
    pub avg_miss_latency_us: f64,
    pub summary: LedgerSummary,
    pub cache: Option<CacheStats>,
    pub heap_allocated_bytes: Option<u64>,
}

/// Run the corpus `rounds` times (at least once) through a fresh engine.
pub async fn run(config: FrugalConfig, rounds: usize) -> Result<BenchReport, FrugalError> {
    let rounds = rounds.max(1);
    let provider: Arc<dyn ProviderAdapter> = Arc::new(SimulatedProvider);
    let mut builder = RoutingEngine::builder(config.clone());
    for id in config.providers.keys() {
        builder = builder.provider(id.clone(), provider.clone());
    }
    let engine = builder.build()?;

    let mut outcomes: Vec<(Tier, RoutingDecision)> = Vec::with_capacity(rounds * CORPUS.len());
    for round in 0..rounds {
        let engine = &engine;
        let batch = CORPUS.iter().map(|&(query_text, expected)| async move {
            let mut query = Query::new(query_text);
            if round == 0 {
                query = query.skip_cache();
            }
            (expected, engine.route(query).await)
        });
        outcomes.extend(join_all(batch).await);
        info!(round = round + 1, rounds, "benchmark round finished");
    }

    let requests = outcomes.len();
    let correct = outcomes
        .iter()
        .filter(|(expected, decision)| decision.tier == *expected)
        .count();

    let cache = match engine.cache() {
        Some(cache) => Some(cache.stats()?),
        None => None,
    };

    Ok(BenchReport {
        rounds,
        requests,
        routing_accuracy_pct: percentage(correct, requests),
        avg_hit_latency_us: average_latency_us(outcomes.iter().map(|(_, d)| d), true),
        avg_miss_latency_us: average_latency_us(outcomes.iter().map(|(_, d)| d), false),
        summary: engine.ledger_summary(None),
        cache,
        heap_allocated_bytes: None,
    })
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

fn average_latency_us<'a>(
    decisions: impl Iterator<Item = &'a RoutingDecision>,
    cache_hit: bool,
) -> f64 {
    let (count, total) = decisions
        .filter(|d| d.was_cache_hit == cache_hit)
        .fold((0u64, 0u128), |(n, sum), d| (n + 1, sum + d.latency.as_micros()));
    if count == 0 {
        0.0
    } else {
        total as f64 / count as f64
    }
}
