// SPDX-FileCopyrightText: 2026 Frugal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Similarity-based response cache.
//!
//! A single mutex guards all cache state. Entries are immutable and shared
//! as `Arc<CacheEntry>`, fully built before they are published, so a lookup
//! racing an insert sees either the state before or after it. No method is
//! async, so the lock can never be held across a suspension point.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::debug;

use frugal_config::model::{CacheConfig, EvictionPolicy};
use frugal_core::{FrugalError, Tier, text};

use crate::similarity::cosine_similarity;

/// Derive the cache key for a query text.
///
/// The text is normalized with the shared tokenizer before hashing, so
/// queries that differ only in case or spacing share a key.
pub fn cache_key(query_text: &str) -> String {
    let digest = Sha256::digest(text::normalize(query_text).as_bytes());
    hex::encode(&digest[..8])
}

/// An immutable cached response.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: String,
    pub embedding: Vec<f32>,
    pub tier: Tier,
    pub response_text: String,
    pub provider_used: String,
    pub created_at: DateTime<Utc>,
    /// What producing the response cost, in USD.
    pub cost_at_creation: f64,
}

impl CacheEntry {
    /// Build an entry keyed by the normalized query text.
    pub fn new(
        query_text: &str,
        embedding: Vec<f32>,
        tier: Tier,
        response_text: impl Into<String>,
        provider_used: impl Into<String>,
        cost_at_creation: f64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            key: cache_key(query_text),
            embedding,
            tier,
            response_text: response_text.into(),
            provider_used: provider_used.into(),
            created_at,
            cost_at_creation,
        }
    }
}

/// A successful lookup.
#[derive(Debug, Clone)]
pub struct CacheHit {
    pub entry: Arc<CacheEntry>,
    pub similarity: f32,
}

/// Policy the cache enforces. Fixed for the lifetime of a cache.
#[derive(Debug, Clone, PartialEq)]
pub struct CachePolicy {
    pub similarity_threshold: f32,
    pub ttl: TimeDelta,
    pub capacity: usize,
    pub eviction: EvictionPolicy,
    /// Required embedding length. `None` until the first insert when unset.
    pub dimensions: Option<usize>,
}

impl CachePolicy {
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            similarity_threshold: config.similarity_threshold,
            ttl: i64::try_from(config.ttl_secs)
                .ok()
                .and_then(TimeDelta::try_seconds)
                .unwrap_or(TimeDelta::MAX),
            capacity: config.capacity,
            eviction: config.eviction,
            dimensions: config.dimensions,
        }
    }

    /// Check the bounds the cache relies on.
    pub fn validate(&self) -> Result<(), FrugalError> {
        let threshold = self.similarity_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(FrugalError::Config(format!(
                "cache.similarity_threshold must be in (0.0, 1.0], got {threshold}"
            )));
        }
        if self.capacity == 0 {
            return Err(FrugalError::Config("cache.capacity must be greater than 0".into()));
        }
        if self.dimensions == Some(0) {
            return Err(FrugalError::Config(
                "cache.dimensions must be greater than 0 when set".into(),
            ));
        }
        Ok(())
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

/// Point-in-time cache statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub live_entries: usize,
    /// Expired but not yet swept.
    pub expired_entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub similarity_threshold: f32,
    pub ttl_secs: i64,
    pub capacity: usize,
    pub dimensions: Option<usize>,
    pub entries_by_tier: Vec<EntrySummary>,
}

/// Live entry count for one tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntrySummary {
    pub tier: Tier,
    pub entries: usize,
}

#[derive(Debug)]
struct Slot {
    entry: Arc<CacheEntry>,
    inserted_seq: u64,
    touched_seq: u64,
}

#[derive(Debug, Default)]
struct CacheState {
    slots: HashMap<String, Slot>,
    dimensions: Option<usize>,
    seq: u64,
}

impl CacheState {
    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }
}

/// Bounded cache of responses, matched by embedding similarity.
#[derive(Debug)]
pub struct SemanticCache {
    policy: CachePolicy,
    state: Mutex<CacheState>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl SemanticCache {
    pub fn new(policy: CachePolicy) -> Self {
        let state = CacheState {
            dimensions: policy.dimensions,
            ..CacheState::default()
        };
        Self {
            policy,
            state: Mutex::new(state),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(CachePolicy::from_config(config))
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    fn lock(&self) -> Result<MutexGuard<'_, CacheState>, FrugalError> {
        self.state
            .lock()
            .map_err(|_| FrugalError::Cache("cache state lock poisoned".into()))
    }

    fn is_expired(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        // An expiry past the representable range never arrives.
        entry
            .created_at
            .checked_add_signed(self.policy.ttl)
            .is_some_and(|expires_at| now >= expires_at)
    }

    /// Find the best live match for `embedding` as of now.
    pub fn lookup(
        &self,
        embedding: &[f32],
        tier: Option<Tier>,
    ) -> Result<Option<CacheHit>, FrugalError> {
        self.lookup_at(embedding, tier, Utc::now())
    }

    /// Find the best live match for `embedding` as of `now`.
    ///
    /// Expired entries are removed before the scan and are never returned.
    /// With a tier filter, entries of other tiers are not eligible. The
    /// candidate with the highest similarity wins; ties go to the most
    /// recently created entry. A hit counts as an access for LRU eviction.
    pub fn lookup_at(
        &self,
        embedding: &[f32],
        tier: Option<Tier>,
        now: DateTime<Utc>,
    ) -> Result<Option<CacheHit>, FrugalError> {
        let mut state = self.lock()?;
        self.sweep(&mut state, now);

        if state.dimensions.is_some_and(|d| d != embedding.len()) || !all_finite(embedding) {
            self.record_miss();
            return Ok(None);
        }

        // (key, similarity, recency) of the best candidate so far.
        let mut best: Option<(&String, f32, (DateTime<Utc>, u64))> = None;
        for (key, slot) in &state.slots {
            if tier.is_some_and(|t| t != slot.entry.tier) {
                continue;
            }
            let similarity = cosine_similarity(embedding, &slot.entry.embedding);
            if !similarity.is_finite() {
                continue;
            }
            let recency = (slot.entry.created_at, slot.inserted_seq);
            let better = match &best {
                None => true,
                Some((_, best_sim, best_recency)) => {
                    similarity > *best_sim || (similarity == *best_sim && recency > *best_recency)
                }
            };
            if better {
                best = Some((key, similarity, recency));
            }
        }

        let hit_key = match best {
            Some((key, similarity, _)) if similarity >= self.policy.similarity_threshold => {
                Some((key.clone(), similarity))
            }
            Some((_, similarity, _)) => {
                debug!(
                    similarity,
                    threshold = self.policy.similarity_threshold,
                    "best cache candidate below threshold"
                );
                None
            }
            None => None,
        };

        let Some((key, similarity)) = hit_key else {
            self.record_miss();
            return Ok(None);
        };

        let seq = state.next_seq();
        let Some(slot) = state.slots.get_mut(&key) else {
            self.record_miss();
            return Ok(None);
        };
        slot.touched_seq = seq;
        self.hits.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("frugal_cache_hits_total").increment(1);

        Ok(Some(CacheHit {
            entry: Arc::clone(&slot.entry),
            similarity,
        }))
    }

    /// Insert or replace an entry as of now.
    pub fn insert(&self, entry: CacheEntry) -> Result<(), FrugalError> {
        self.insert_at(entry, Utc::now())
    }

    /// Insert or replace an entry, using `now` to decide which entries have expired.
    ///
    /// An entry with an existing key replaces the old one as a whole. When a
    /// new key would exceed capacity, expired entries are dropped first, then
    /// entries are evicted in policy order until there is room. A cache with
    /// zero capacity stores nothing.
    pub fn insert_at(&self, entry: CacheEntry, now: DateTime<Utc>) -> Result<(), FrugalError> {
        if !all_finite(&entry.embedding) {
            return Err(FrugalError::Embedding {
                message: "embedding contains non-finite values".into(),
                source: None,
            });
        }
        if self.policy.capacity == 0 {
            debug!(key = %entry.key, "cache has zero capacity, insert skipped");
            return Ok(());
        }

        let mut state = self.lock()?;

        match state.dimensions {
            Some(expected) if expected != entry.embedding.len() => {
                return Err(FrugalError::DimensionMismatch {
                    expected,
                    actual: entry.embedding.len(),
                });
            }
            None if entry.embedding.is_empty() => {
                return Err(FrugalError::DimensionMismatch {
                    expected: 1,
                    actual: 0,
                });
            }
            None => state.dimensions = Some(entry.embedding.len()),
            Some(_) => {}
        }

        if !state.slots.contains_key(&entry.key) && state.slots.len() >= self.policy.capacity {
            self.sweep(&mut state, now);
            while state.slots.len() >= self.policy.capacity {
                if !self.evict_one(&mut state) {
                    break;
                }
            }
        }

        let seq = state.next_seq();
        let key = entry.key.clone();
        state.slots.insert(
            key,
            Slot {
                entry: Arc::new(entry),
                inserted_seq: seq,
                touched_seq: seq,
            },
        );
        Ok(())
    }

    /// Remove every entry expired as of `now`. Returns the number removed.
    pub fn evict_expired(&self, now: DateTime<Utc>) -> Result<usize, FrugalError> {
        let mut state = self.lock()?;
        Ok(self.sweep(&mut state, now))
    }

    /// Remove the entry with `key`. Returns whether it existed.
    pub fn invalidate(&self, key: &str) -> Result<bool, FrugalError> {
        let mut state = self.lock()?;
        Ok(state.slots.remove(key).is_some())
    }

    /// Remove every entry. Returns the number removed.
    ///
    /// A dimensionality learned from earlier inserts is kept.
    pub fn clear(&self) -> Result<usize, FrugalError> {
        let mut state = self.lock()?;
        let count = state.slots.len();
        state.slots.clear();
        Ok(count)
    }

    /// Number of stored entries, including expired entries not yet swept.
    pub fn len(&self) -> usize {
        // Counting is safe on a poisoned map; entries are only published whole.
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .slots
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> Result<CacheStats, FrugalError> {
        self.stats_at(Utc::now())
    }

    pub fn stats_at(&self, now: DateTime<Utc>) -> Result<CacheStats, FrugalError> {
        let state = self.lock()?;
        let mut by_tier: HashMap<Tier, usize> = HashMap::new();
        let mut expired = 0;
        for slot in state.slots.values() {
            if self.is_expired(&slot.entry, now) {
                expired += 1;
            } else {
                *by_tier.entry(slot.entry.tier).or_default() += 1;
            }
        }
        let entries_by_tier = Tier::ALL
            .iter()
            .map(|&tier| EntrySummary {
                tier,
                entries: by_tier.get(&tier).copied().unwrap_or(0),
            })
            .collect();

        Ok(CacheStats {
            total_entries: state.slots.len(),
            live_entries: state.slots.len() - expired,
            expired_entries: expired,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            similarity_threshold: self.policy.similarity_threshold,
            ttl_secs: self.policy.ttl.num_seconds(),
            capacity: self.policy.capacity,
            dimensions: state.dimensions,
            entries_by_tier,
        })
    }

    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("frugal_cache_misses_total").increment(1);
    }

    fn sweep(&self, state: &mut CacheState, now: DateTime<Utc>) -> usize {
        let before = state.slots.len();
        state.slots.retain(|_, slot| !self.is_expired(&slot.entry, now));
        let removed = before - state.slots.len();
        if removed > 0 {
            self.evictions.fetch_add(removed as u64, Ordering::Relaxed);
            metrics::counter!("frugal_cache_evictions_total", "reason" => "expired")
                .increment(removed as u64);
            debug!(removed, "expired cache entries evicted");
        }
        removed
    }

    fn evict_one(&self, state: &mut CacheState) -> bool {
        let eviction = self.policy.eviction;
        let victim = state
            .slots
            .iter()
            .min_by_key(|(_, slot)| match eviction {
                EvictionPolicy::Lru => slot.touched_seq,
                EvictionPolicy::Fifo => slot.inserted_seq,
            })
            .map(|(key, _)| key.clone());

        let Some(key) = victim else {
            return false;
        };
        state.slots.remove(&key);
        self.evictions.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("frugal_cache_evictions_total", "reason" => "capacity").increment(1);
        debug!(key = %key, policy = %eviction, "cache entry evicted for capacity");
        true
    }
}

fn all_finite(embedding: &[f32]) -> bool {
    embedding.iter().all(|v| v.is_finite())
}
