// SPDX-FileCopyrightText: 2026 Frugal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the complete routing pipeline.
//!
//! Each test builds an isolated TestHarness with mock adapters. Tests are
//! independent and order-insensitive.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use futures::future::join_all;

use frugal_config::FrugalConfig;
use frugal_core::{Degradation, Query, Tier};
use frugal_cost::{CostLedger, TimeWindow};
use frugal_test_utils::{HARNESS_DIMENSIONS, TestHarness};

const SIMPLE: &str = "What is Python?";
const MEDIUM: &str = "Explain the difference between REST and GraphQL APIs";
const COMPLEX: &str = "Design a distributed cache system for a social media platform that \
                       handles 10 million requests per second with low latency and high availability";

fn unit_vector() -> Vec<f32> {
    let mut v = vec![0.0; HARNESS_DIMENSIONS];
    v[0] = 1.0;
    v
}

// ---- Test 1: Cache miss then hit ----

#[tokio::test]
async fn test_repeated_query_is_served_from_cache() {
    let harness = TestHarness::builder()
        .with_mock_responses(vec!["Python is a programming language.".to_string()])
        .build()
        .unwrap();

    let first = harness.route(SIMPLE).await;
    assert!(!first.was_cache_hit);
    assert_eq!(first.tier, Tier::Simple);
    assert_eq!(first.provider_selected, "ollama/llama3.2");
    assert_eq!(first.actual_cost_usd, 0.0);

    let second = harness.route(SIMPLE).await;
    assert!(second.was_cache_hit);
    assert_eq!(second.response_text, first.response_text);
    assert_eq!(second.provider_selected, first.provider_selected);
    assert_eq!(second.actual_cost_usd, 0.0);
    assert_eq!(second.usage.total(), 0);
    assert!(second.cache_similarity.unwrap() >= 0.999);
    assert!(second.baseline_cost_usd > 0.0);

    assert_eq!(harness.mock_provider.call_count(), 1);
}

#[tokio::test]
async fn test_cache_hit_on_cloud_provider_costs_nothing() {
    let harness = TestHarness::builder().build().unwrap();

    let miss = harness.route(COMPLEX).await;
    assert_eq!(miss.tier, Tier::Complex);
    assert_eq!(miss.provider_selected, "gpt-4-turbo");
    assert!(miss.actual_cost_usd > 0.0);
    assert!(miss.actual_cost_usd < miss.baseline_cost_usd);

    let hit = harness.route(COMPLEX).await;
    assert!(hit.was_cache_hit);
    assert_eq!(hit.actual_cost_usd, 0.0);

    let summary = harness.engine.ledger_summary(None);
    assert_eq!(summary.total_requests, 2);
    assert_eq!(summary.cache_hits, 1);
    assert!(summary.savings_percentage > 50.0);
}

// ---- Test 2: Provider failures ----

#[tokio::test]
async fn test_provider_failure_yields_error_decision() {
    let harness = TestHarness::builder()
        .with_provider_failure("connection refused")
        .build()
        .unwrap();

    let decision = harness.route(SIMPLE).await;
    let error = decision.error.clone().expect("expected an error");
    assert!(error.is_invocation_failure());
    assert!(!error.is_timeout());
    assert!(error.to_string().contains("connection refused"));
    assert!(decision.response_text.is_none());
    assert_eq!(decision.actual_cost_usd, 0.0);

    // Failures are never cached.
    assert!(harness.engine.cache().unwrap().is_empty());
    let again = harness.route(SIMPLE).await;
    assert!(!again.was_cache_hit);
    assert_eq!(harness.mock_provider.call_count(), 2);

    let summary = harness.engine.ledger_summary(None);
    assert_eq!(summary.errors, 2);
}

#[tokio::test(start_paused = true)]
async fn test_provider_timeout_is_reported() {
    let mut config = FrugalConfig::default();
    config.routing.provider_timeout_secs = 1;
    let harness = TestHarness::builder()
        .with_config(config)
        .with_provider_delay(Duration::from_secs(30))
        .build()
        .unwrap();

    let decision = harness.route(SIMPLE).await;
    let error = decision.error.expect("expected a timeout");
    assert!(error.is_timeout());
    assert!(error.is_invocation_failure());
    assert_eq!(error.provider(), "ollama/llama3.2");
    assert!(harness.engine.cache().unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_forced_provider_is_invocation_failure() {
    let harness = TestHarness::builder().build().unwrap();
    let decision = harness
        .engine
        .route(Query::new(SIMPLE).force_provider("nonexistent"))
        .await;
    let error = decision.error.expect("expected an error");
    assert!(error.is_invocation_failure());
    assert_eq!(decision.provider_selected, "nonexistent");
    assert_eq!(harness.mock_provider.call_count(), 0);
}

// ---- Test 3: Embedding degradation ----

#[tokio::test]
async fn test_embedding_outage_forces_miss_and_skips_insert() {
    let harness = TestHarness::builder().build().unwrap();
    harness.mock_embedder.set_available(false);

    let decision = harness.route(SIMPLE).await;
    assert!(!decision.is_error());
    assert!(!decision.was_cache_hit);
    assert_eq!(decision.degradations, vec![Degradation::EmbeddingUnavailable]);
    assert!(harness.engine.cache().unwrap().is_empty());

    harness.mock_embedder.set_available(true);
    assert!(!harness.route(SIMPLE).await.was_cache_hit);
    assert!(harness.route(SIMPLE).await.was_cache_hit);
}

#[tokio::test(start_paused = true)]
async fn test_slow_embedder_times_out() {
    let mut config = FrugalConfig::default();
    config.cache.embedding_timeout_ms = 100;
    let harness = TestHarness::builder()
        .with_config(config)
        .with_embedder_delay(Duration::from_secs(5))
        .build()
        .unwrap();

    let decision = harness.route(SIMPLE).await;
    assert!(!decision.is_error());
    assert_eq!(decision.degradations, vec![Degradation::EmbeddingUnavailable]);
    assert!(harness.engine.cache().unwrap().is_empty());
}

// ---- Test 4: Tier isolation ----

#[tokio::test]
async fn test_tier_isolation_blocks_cross_tier_hits() {
    let harness = TestHarness::builder().build().unwrap();
    harness.mock_embedder.set_vector(SIMPLE, unit_vector());
    harness.mock_embedder.set_vector(MEDIUM, unit_vector());

    let simple = harness.route(SIMPLE).await;
    assert_eq!(simple.tier, Tier::Simple);

    let medium = harness.route(MEDIUM).await;
    assert_eq!(medium.tier, Tier::Medium);
    assert!(!medium.was_cache_hit);
    assert_eq!(harness.mock_provider.call_count(), 2);
}

#[tokio::test]
async fn test_shared_cache_across_tiers_when_isolation_disabled() {
    let mut config = FrugalConfig::default();
    config.cache.tier_isolation = false;
    let harness = TestHarness::builder().with_config(config).build().unwrap();
    harness.mock_embedder.set_vector(SIMPLE, unit_vector());
    harness.mock_embedder.set_vector(MEDIUM, unit_vector());

    harness.route(SIMPLE).await;
    let medium = harness.route(MEDIUM).await;
    assert!(medium.was_cache_hit);
    assert_eq!(medium.tier, Tier::Medium);
}

// ---- Test 5: Per-query options ----

#[tokio::test]
async fn test_skip_cache_always_invokes_provider() {
    let harness = TestHarness::builder().build().unwrap();
    harness.route(SIMPLE).await;

    let decision = harness.engine.route(Query::new(SIMPLE).skip_cache()).await;
    assert!(!decision.was_cache_hit);
    assert_eq!(harness.mock_provider.call_count(), 2);
}

#[tokio::test]
async fn test_force_provider_overrides_mapping() {
    let harness = TestHarness::builder().build().unwrap();
    let decision = harness
        .engine
        .route(Query::new(SIMPLE).force_provider("gpt-4-turbo").skip_cache())
        .await;
    assert_eq!(decision.tier, Tier::Simple);
    assert_eq!(decision.provider_selected, "gpt-4-turbo");
    assert!(decision.actual_cost_usd > 0.0);

    let requests = harness.mock_provider.requests().await;
    assert_eq!(requests[0].model, "gpt-4-turbo");
    assert_eq!(requests[0].tier, Tier::Simple);
}

#[tokio::test]
async fn test_disabled_routing_uses_medium_provider() {
    let mut config = FrugalConfig::default();
    config.routing.enabled = false;
    config.routing.medium_provider = "gpt-3.5-turbo".to_string();
    let harness = TestHarness::builder().with_config(config).build().unwrap();

    let decision = harness.route(COMPLEX).await;
    assert_eq!(decision.tier, Tier::Complex);
    assert_eq!(decision.provider_selected, "gpt-3.5-turbo");
}

#[tokio::test]
async fn test_oversized_query_is_flagged_degraded() {
    let mut config = FrugalConfig::default();
    config.classifier.max_scan_bytes = 8;
    let harness = TestHarness::builder().with_config(config).build().unwrap();

    let decision = harness.route(COMPLEX).await;
    assert!(decision.degradations.contains(&Degradation::ClassificationDegraded));
    assert!(!decision.is_error());
}

// ---- Test 6: Ledger accounting ----

#[tokio::test]
async fn test_duplicate_query_id_is_recorded_once() {
    let harness = TestHarness::builder().build().unwrap();
    let first = harness.engine.route(Query::with_id("q-1", SIMPLE)).await;
    let second = harness.engine.route(Query::with_id("q-1", MEDIUM)).await;

    assert_eq!(first.query_id, second.query_id);
    assert_eq!(harness.engine.ledger().len(), 1);
}

#[tokio::test]
async fn test_ledger_is_order_independent() {
    let harness = TestHarness::builder().build().unwrap();
    let mut decisions = Vec::new();
    for text in [SIMPLE, MEDIUM, COMPLEX, SIMPLE, COMPLEX] {
        decisions.push(harness.route(text).await);
    }

    let forward = CostLedger::new();
    let backward = CostLedger::new();
    for decision in &decisions {
        forward.record(decision).unwrap();
    }
    for decision in decisions.iter().rev() {
        backward.record(decision).unwrap();
    }

    assert_eq!(forward.summary(None), backward.summary(None));
    assert_eq!(forward.summary(None), harness.engine.ledger_summary(None));
}

#[tokio::test]
async fn test_ledger_window_filters_by_creation_time() {
    let harness = TestHarness::builder().build().unwrap();
    harness.route(SIMPLE).await;
    harness.route(MEDIUM).await;

    let now = Utc::now();
    let recent = harness
        .engine
        .ledger_summary(Some(TimeWindow::last(TimeDelta::hours(1), now)));
    assert_eq!(recent.total_requests, 2);

    let past = TimeWindow::new(now - TimeDelta::days(2), now - TimeDelta::days(1));
    assert_eq!(harness.engine.ledger_summary(Some(past)).total_requests, 0);
}

// ---- Test 7: Concurrency ----

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_routes_each_produce_one_decision() {
    let harness = TestHarness::builder().build().unwrap();
    let texts: Vec<String> = (0..32)
        .map(|i| format!("question number {i} about topic {}", i * 7))
        .collect();

    let decisions = join_all(texts.iter().map(|t| harness.route(t))).await;

    assert_eq!(decisions.len(), texts.len());
    assert!(decisions.iter().all(|d| !d.is_error()));
    let ids: HashSet<_> = decisions.iter().map(|d| d.query_id.clone()).collect();
    assert_eq!(ids.len(), texts.len());
    assert_eq!(harness.engine.ledger().len(), texts.len());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_identical_queries_all_succeed() {
    let harness = TestHarness::builder().build().unwrap();
    let engine = harness.engine.clone();

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let engine = engine.clone();
            tokio::spawn(async move { engine.route(Query::new(SIMPLE)).await })
        })
        .collect();

    let mut routed = 0;
    for handle in handles {
        let decision = handle.await.unwrap();
        assert!(!decision.is_error());
        routed += 1;
    }
    assert_eq!(routed, 16);
    assert_eq!(harness.engine.cache().unwrap().len(), 1);
    assert_eq!(harness.engine.ledger_summary(None).total_requests, 16);
}
