// SPDX-FileCopyrightText: 2026 Frugal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade so any installed recorder can collect these
//! metrics. Without a recorder every call is a no-op.

use metrics::{describe_counter, describe_gauge, describe_histogram};

use frugal_core::{DecisionError, Degradation, RoutingDecision};

/// Register all Frugal metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!("frugal_requests_total", "Routing decisions produced");
    describe_counter!("frugal_cache_hits_total", "Semantic cache hits");
    describe_counter!("frugal_cache_misses_total", "Semantic cache misses");
    describe_counter!(
        "frugal_cache_evictions_total",
        "Cache entries removed by expiry or capacity"
    );
    describe_counter!(
        "frugal_provider_errors_total",
        "Failed or timed out provider invocations"
    );
    describe_counter!(
        "frugal_degradations_total",
        "Non-fatal degradations recorded on decisions"
    );
    describe_histogram!(
        "frugal_route_latency_seconds",
        "End-to-end routing latency in seconds"
    );
    describe_gauge!("frugal_memory_heap_bytes", "Allocated heap bytes");
}

/// Record a completed routing decision.
pub fn record_decision(decision: &RoutingDecision) {
    let outcome = if decision.is_error() {
        "error"
    } else if decision.was_cache_hit {
        "hit"
    } else {
        "miss"
    };
    metrics::counter!(
        "frugal_requests_total",
        "tier" => decision.tier.to_string(),
        "provider" => decision.provider_selected.clone(),
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!("frugal_route_latency_seconds", "tier" => decision.tier.to_string())
        .record(decision.latency.as_secs_f64());

    for degradation in &decision.degradations {
        record_degradation(*degradation);
    }
    if let Some(error) = &decision.error {
        record_provider_error(error);
    }
}

/// Record a single degradation.
pub fn record_degradation(degradation: Degradation) {
    metrics::counter!("frugal_degradations_total", "kind" => degradation.to_string()).increment(1);
}

/// Record a provider failure.
pub fn record_provider_error(error: &DecisionError) {
    let kind = if error.is_timeout() {
        "timeout"
    } else {
        "invocation_failed"
    };
    metrics::counter!(
        "frugal_provider_errors_total",
        "provider" => error.provider().to_string(),
        "kind" => kind
    )
    .increment(1);
}

/// Set the allocated heap size in bytes.
pub fn set_memory_heap(bytes: f64) {
    metrics::gauge!("frugal_memory_heap_bytes").set(bytes);
}
