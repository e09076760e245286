// SPDX-FileCopyrightText: 2026 Frugal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only cost and usage ledger.
//!
//! Every routing decision is recorded once. Costs are accumulated as integer
//! nano-USD and latencies as integer microseconds, so totals are exact and
//! a summary does not depend on the order decisions were recorded in.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Days, NaiveDate, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use frugal_core::{FrugalError, QueryId, RoutingDecision, Tier};

const NANOS_PER_USD: f64 = 1_000_000_000.0;

/// Convert USD to whole nano-USD. Negative and non-finite amounts count as zero.
pub fn usd_to_nanos(usd: f64) -> u64 {
    if !usd.is_finite() || usd <= 0.0 {
        return 0;
    }
    (usd * NANOS_PER_USD).round() as u64
}

pub fn nanos_to_usd(nanos: u64) -> f64 {
    nanos as f64 / NANOS_PER_USD
}

/// An inclusive time range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// The `span` ending at `now`.
    pub fn last(span: TimeDelta, now: DateTime<Utc>) -> Self {
        Self {
            start: now - span,
            end: now,
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at <= self.end
    }
}

/// One recorded decision, reduced to what aggregation needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub query_id: QueryId,
    pub tier: Tier,
    pub was_cache_hit: bool,
    pub provider: String,
    pub is_error: bool,
    pub actual_cost_nanos: u64,
    pub baseline_cost_nanos: u64,
    pub latency_micros: u64,
    pub created_at: DateTime<Utc>,
}

impl LedgerRecord {
    pub fn from_decision(decision: &RoutingDecision) -> Self {
        Self {
            query_id: decision.query_id.clone(),
            tier: decision.tier,
            was_cache_hit: decision.was_cache_hit,
            provider: decision.provider_selected.clone(),
            is_error: decision.is_error(),
            actual_cost_nanos: usd_to_nanos(decision.actual_cost_usd),
            baseline_cost_nanos: usd_to_nanos(decision.baseline_cost_usd),
            latency_micros: u64::try_from(decision.latency.as_micros()).unwrap_or(u64::MAX),
            created_at: decision.created_at,
        }
    }
}

/// Aggregates over the recorded decisions in a window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerSummary {
    pub window: Option<TimeWindow>,
    pub total_requests: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub errors: u64,
    pub total_actual_cost_usd: f64,
    pub total_baseline_cost_usd: f64,
    pub total_savings_usd: f64,
    /// `(baseline - actual) / baseline * 100`, or 0 with no baseline.
    pub savings_percentage: f64,
    /// Cache hits as a percentage of requests.
    pub cache_hit_rate: f64,
    pub avg_latency_ms: f64,
    pub requests_by_provider: BTreeMap<String, u64>,
    pub requests_by_tier: BTreeMap<Tier, u64>,
    pub cost_by_provider_usd: BTreeMap<String, f64>,
}

impl LedgerSummary {
    /// Savings as a fraction in `[0, 1]` for costs that never exceed the baseline.
    pub fn savings_fraction(&self) -> f64 {
        self.savings_percentage / 100.0
    }
}

/// Per-day totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyStats {
    pub date: NaiveDate,
    pub requests: u64,
    pub cache_hits: u64,
    pub actual_cost_usd: f64,
    pub baseline_cost_usd: f64,
    pub savings_usd: f64,
}

#[derive(Debug, Default)]
struct Totals {
    requests: u64,
    cache_hits: u64,
    errors: u64,
    actual_nanos: u64,
    baseline_nanos: u64,
    latency_micros: u64,
    by_provider: BTreeMap<String, u64>,
    by_tier: BTreeMap<Tier, u64>,
    cost_by_provider: BTreeMap<String, u64>,
}

impl Totals {
    fn add(&mut self, record: &LedgerRecord) {
        self.requests += 1;
        self.cache_hits += u64::from(record.was_cache_hit);
        self.errors += u64::from(record.is_error);
        self.actual_nanos = self.actual_nanos.saturating_add(record.actual_cost_nanos);
        self.baseline_nanos = self.baseline_nanos.saturating_add(record.baseline_cost_nanos);
        self.latency_micros = self.latency_micros.saturating_add(record.latency_micros);
        *self.by_provider.entry(record.provider.clone()).or_default() += 1;
        *self.by_tier.entry(record.tier).or_default() += 1;
        let cost = self.cost_by_provider.entry(record.provider.clone()).or_default();
        *cost = cost.saturating_add(record.actual_cost_nanos);
    }

    fn into_summary(self, window: Option<TimeWindow>) -> LedgerSummary {
        let savings_nanos = i128::from(self.baseline_nanos) - i128::from(self.actual_nanos);
        let savings_percentage = if self.baseline_nanos == 0 {
            0.0
        } else {
            savings_nanos as f64 / self.baseline_nanos as f64 * 100.0
        };
        let (cache_hit_rate, avg_latency_ms) = if self.requests == 0 {
            (0.0, 0.0)
        } else {
            (
                self.cache_hits as f64 / self.requests as f64 * 100.0,
                self.latency_micros as f64 / self.requests as f64 / 1_000.0,
            )
        };

        LedgerSummary {
            window,
            total_requests: self.requests,
            cache_hits: self.cache_hits,
            cache_misses: self.requests - self.cache_hits,
            errors: self.errors,
            total_actual_cost_usd: nanos_to_usd(self.actual_nanos),
            total_baseline_cost_usd: nanos_to_usd(self.baseline_nanos),
            total_savings_usd: savings_nanos as f64 / NANOS_PER_USD,
            savings_percentage,
            cache_hit_rate,
            avg_latency_ms,
            requests_by_provider: self.by_provider,
            requests_by_tier: self.by_tier,
            cost_by_provider_usd: self
                .cost_by_provider
                .into_iter()
                .map(|(provider, nanos)| (provider, nanos_to_usd(nanos)))
                .collect(),
        }
    }
}

#[derive(Debug, Default)]
struct LedgerState {
    records: Vec<LedgerRecord>,
    seen: HashSet<QueryId>,
}

/// Thread-safe accumulator of routing decisions.
///
/// Created once and shared by `Arc` with every recording site. It is never
/// reset; readers take snapshots through [`summary`](Self::summary).
#[derive(Debug, Default)]
pub struct CostLedger {
    state: Mutex<LedgerState>,
}

impl CostLedger {
    pub fn new() -> Self {
        Self::default()
    }

    // Records are only ever appended whole, so a poisoned lock still guards
    // consistent data.
    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a decision. A second decision for the same query id is rejected.
    pub fn record(&self, decision: &RoutingDecision) -> Result<(), FrugalError> {
        let record = LedgerRecord::from_decision(decision);
        let mut state = self.lock();
        if !state.seen.insert(record.query_id.clone()) {
            warn!(query_id = %record.query_id, "duplicate decision not recorded");
            return Err(FrugalError::DuplicateRecord {
                query_id: record.query_id.to_string(),
            });
        }
        debug!(
            query_id = %record.query_id,
            provider = %record.provider,
            tier = %record.tier,
            cache_hit = record.was_cache_hit,
            actual_nanos = record.actual_cost_nanos,
            baseline_nanos = record.baseline_cost_nanos,
            "decision recorded"
        );
        state.records.push(record);
        Ok(())
    }

    /// Number of recorded decisions.
    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, query_id: &QueryId) -> bool {
        self.lock().seen.contains(query_id)
    }

    /// Aggregate all decisions, or only those created inside `window`.
    pub fn summary(&self, window: Option<TimeWindow>) -> LedgerSummary {
        let state = self.lock();
        let mut totals = Totals::default();
        for record in state
            .records
            .iter()
            .filter(|r| window.is_none_or(|w| w.contains(r.created_at)))
        {
            totals.add(record);
        }
        totals.into_summary(window)
    }

    /// Per-day totals for the `days` calendar days (UTC) ending with `now`, oldest first.
    ///
    /// Days without traffic are included with zero totals.
    pub fn daily_stats(&self, days: u32, now: DateTime<Utc>) -> Vec<DailyStats> {
        let today = now.date_naive();
        let Some(first) = today.checked_sub_days(Days::new(u64::from(days.saturating_sub(1))))
        else {
            return Vec::new();
        };

        let mut per_day: BTreeMap<NaiveDate, Totals> = BTreeMap::new();
        let mut day = first;
        for _ in 0..days {
            per_day.insert(day, Totals::default());
            match day.succ_opt() {
                Some(next) => day = next,
                None => break,
            }
        }

        let state = self.lock();
        for record in &state.records {
            if let Some(totals) = per_day.get_mut(&record.created_at.date_naive()) {
                totals.add(record);
            }
        }

        per_day
            .into_iter()
            .map(|(date, t)| DailyStats {
                date,
                requests: t.requests,
                cache_hits: t.cache_hits,
                actual_cost_usd: nanos_to_usd(t.actual_nanos),
                baseline_cost_usd: nanos_to_usd(t.baseline_nanos),
                savings_usd: (i128::from(t.baseline_nanos) - i128::from(t.actual_nanos)) as f64
                    / NANOS_PER_USD,
            })
            .collect()
    }
}
