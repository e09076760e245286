// SPDX-FileCopyrightText: 2026 Frugal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Routing engine: classify, consult the cache, invoke a provider, account.
//!
//! Every call to [`RoutingEngine::route`] produces exactly one
//! [`RoutingDecision`], recorded in the ledger before it is returned. Provider
//! failures and timeouts are reported on the decision, never as an `Err`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use chrono::Utc;
use tracing::{debug, info, warn};

use frugal_cache::{
    CacheEntry, CacheHit, CachePolicy, DEFAULT_DIMENSIONS, HashingEmbedder, SemanticCache,
};
use frugal_config::model::{FrugalConfig, RoutingConfig};
use frugal_core::{
    DecisionError, Degradation, EmbeddingAdapter, FrugalError, ProviderAdapter, ProviderRequest,
    ProviderResponse, Query, RoutingDecision, Tier, TokenUsage, text,
};
use frugal_cost::{CostLedger, LedgerSummary, PricingTable, TimeWindow};

use crate::classifier::{ClassifierRules, ComplexityResult};

/// Immutable routing configuration: classifier rules, tier mapping and pricing.
///
/// Swapped as a whole on reload. A route loads it once, so it never sees a
/// mix of old and new settings.
#[derive(Debug)]
pub struct RoutingSnapshot {
    rules: ClassifierRules,
    routing: RoutingConfig,
    pricing: PricingTable,
}

impl RoutingSnapshot {
    pub fn from_config(config: &FrugalConfig) -> Result<Self, FrugalError> {
        Ok(Self {
            rules: ClassifierRules::from_config(&config.classifier)?,
            routing: config.routing.clone(),
            pricing: PricingTable::from_config(config)?,
        })
    }

    pub fn rules(&self) -> &ClassifierRules {
        &self.rules
    }

    pub fn routing(&self) -> &RoutingConfig {
        &self.routing
    }

    pub fn pricing(&self) -> &PricingTable {
        &self.pricing
    }

    /// Provider for a query: per-query override, then configured override, then tier mapping.
    fn select_provider(&self, query: &Query, tier: Tier) -> String {
        query
            .force_provider
            .as_deref()
            .or(self.routing.force_provider.as_deref())
            .unwrap_or_else(|| self.routing.provider_for_tier(tier))
            .to_string()
    }

    /// Reference-provider cost of the query and response, counted with the shared tokenizer.
    fn baseline_cost(&self, prompt: &str, response: Option<&str>) -> f64 {
        let usage = TokenUsage::new(
            text::count_tokens(prompt),
            response.map_or(0, text::count_tokens),
        );
        self.pricing.baseline_cost(&usage)
    }
}

/// Builder for [`RoutingEngine`].
pub struct RoutingEngineBuilder {
    config: FrugalConfig,
    embedder: Option<Arc<dyn EmbeddingAdapter>>,
    providers: HashMap<String, Arc<dyn ProviderAdapter>>,
    ledger: Option<Arc<CostLedger>>,
}

impl RoutingEngineBuilder {
    /// Embedding adapter for the cache. Defaults to a [`HashingEmbedder`].
    pub fn embedder(mut self, embedder: Arc<dyn EmbeddingAdapter>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Register the adapter that serves a provider id.
    pub fn provider(mut self, id: impl Into<String>, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.providers.insert(id.into(), adapter);
        self
    }

    /// Share an existing ledger instead of creating a new one.
    pub fn ledger(mut self, ledger: Arc<CostLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn build(self) -> Result<RoutingEngine, FrugalError> {
        let snapshot = RoutingSnapshot::from_config(&self.config)?;
        let cache_config = &self.config.cache;

        let (cache, embedder) = if cache_config.enabled {
            let policy = CachePolicy::from_config(cache_config);
            policy.validate()?;
            let embedder = match self.embedder {
                Some(embedder) => embedder,
                None => {
                    let dimensions = cache_config.dimensions.unwrap_or(DEFAULT_DIMENSIONS);
                    info!(dimensions, "no embedding adapter supplied, using hashing embedder");
                    Arc::new(HashingEmbedder::new(dimensions)) as Arc<dyn EmbeddingAdapter>
                }
            };
            if let Some(expected) = cache_config.dimensions
                && expected != embedder.dimensions()
            {
                return Err(FrugalError::DimensionMismatch {
                    expected,
                    actual: embedder.dimensions(),
                });
            }
            (
                Some(Arc::new(SemanticCache::new(policy))),
                Some(embedder),
            )
        } else {
            debug!("semantic cache disabled by configuration");
            (None, None)
        };

        let routing = snapshot.routing();
        for id in [
            &routing.simple_provider,
            &routing.medium_provider,
            &routing.complex_provider,
        ] {
            if !self.providers.contains_key(id) {
                warn!(provider = %id, "mapped provider has no registered adapter");
            }
        }

        Ok(RoutingEngine {
            snapshot: ArcSwap::from_pointee(snapshot),
            cache,
            tier_isolation: cache_config.tier_isolation,
            embedding_timeout: Duration::from_millis(cache_config.embedding_timeout_ms),
            embedder,
            providers: self.providers,
            ledger: self.ledger.unwrap_or_default(),
        })
    }
}

/// Routes queries to the cheapest adequate provider, through the semantic cache.
pub struct RoutingEngine {
    snapshot: ArcSwap<RoutingSnapshot>,
    cache: Option<Arc<SemanticCache>>,
    tier_isolation: bool,
    embedding_timeout: Duration,
    embedder: Option<Arc<dyn EmbeddingAdapter>>,
    providers: HashMap<String, Arc<dyn ProviderAdapter>>,
    ledger: Arc<CostLedger>,
}

impl RoutingEngine {
    pub fn builder(config: FrugalConfig) -> RoutingEngineBuilder {
        RoutingEngineBuilder {
            config,
            embedder: None,
            providers: HashMap::new(),
            ledger: None,
        }
    }

    /// Classify text with the current rules.
    pub fn classify(&self, input: &str) -> ComplexityResult {
        self.snapshot.load().rules.classify(input)
    }

    /// Ledger totals, optionally restricted to a time window.
    pub fn ledger_summary(&self, window: Option<TimeWindow>) -> LedgerSummary {
        self.ledger.summary(window)
    }

    pub fn ledger(&self) -> &Arc<CostLedger> {
        &self.ledger
    }

    /// The semantic cache, if enabled.
    pub fn cache(&self) -> Option<&Arc<SemanticCache>> {
        self.cache.as_ref()
    }

    /// Current configuration snapshot.
    pub fn snapshot(&self) -> Arc<RoutingSnapshot> {
        self.snapshot.load_full()
    }

    /// Replace classifier rules, routing table and pricing in one step.
    ///
    /// Cache settings are fixed when the engine is built and are not reloaded.
    /// On error the previous snapshot stays in effect.
    pub fn reload(&self, config: &FrugalConfig) -> Result<(), FrugalError> {
        let snapshot = RoutingSnapshot::from_config(config)?;
        self.snapshot.store(Arc::new(snapshot));
        info!("routing configuration reloaded");
        Ok(())
    }

    /// Route one query and return its decision.
    pub async fn route(&self, query: Query) -> RoutingDecision {
        let started = Instant::now();
        let snapshot = self.snapshot.load_full();
        let mut degradations = Vec::new();

        let classification = snapshot.rules.classify(&query.text);
        let tier = classification.tier;
        if classification.degraded {
            warn!(query_id = %query.id, "query truncated before classification");
            degrade(&mut degradations, Degradation::ClassificationDegraded);
        }
        debug!(
            query_id = %query.id,
            %tier,
            score = classification.score,
            signals = ?classification.signals,
            "query classified"
        );

        let embedding = match self.cache {
            Some(_) => self.embed(&query, &mut degradations).await,
            None => None,
        };

        let lookup = match (&self.cache, &embedding) {
            (Some(cache), Some(embedding)) if !query.skip_cache => {
                Some(cache.lookup(embedding, self.tier_isolation.then_some(tier)))
            }
            _ => None,
        };
        match lookup {
            Some(Ok(Some(hit))) => {
                let decision = self.hit_decision(&snapshot, &query, tier, hit, degradations, started);
                return self.complete(decision);
            }
            Some(Ok(None)) => debug!(query_id = %query.id, "cache miss"),
            Some(Err(e)) => {
                warn!(query_id = %query.id, error = %e, "cache lookup failed, treating as miss");
                degrade(&mut degradations, Degradation::CacheUnavailable);
            }
            None => {}
        }

        let provider = snapshot.select_provider(&query, tier);
        match self.invoke(&snapshot, &provider, tier, &query.text).await {
            Ok(response) => {
                let actual_cost_usd = self.actual_cost(&snapshot, &provider, &response);
                if let (Some(cache), Some(embedding)) = (&self.cache, embedding) {
                    let entry = CacheEntry::new(
                        &query.text,
                        embedding,
                        tier,
                        response.content.clone(),
                        provider.clone(),
                        actual_cost_usd,
                        Utc::now(),
                    );
                    if let Err(e) = cache.insert(entry) {
                        warn!(query_id = %query.id, error = %e, "cache insert failed");
                        degrade(&mut degradations, Degradation::CacheUnavailable);
                    }
                }

                let decision = RoutingDecision {
                    baseline_cost_usd: snapshot.baseline_cost(&query.text, Some(&response.content)),
                    query_id: query.id,
                    tier,
                    was_cache_hit: false,
                    cache_similarity: None,
                    provider_selected: provider,
                    response_text: Some(response.content),
                    usage: response.usage,
                    actual_cost_usd,
                    latency: started.elapsed(),
                    provider_elapsed: Some(response.elapsed),
                    degradations,
                    error: None,
                    created_at: Utc::now(),
                };
                self.complete(decision)
            }
            Err(error) => {
                warn!(query_id = %query.id, error = %error, "provider invocation failed");
                let decision = RoutingDecision {
                    baseline_cost_usd: snapshot.baseline_cost(&query.text, None),
                    query_id: query.id,
                    tier,
                    was_cache_hit: false,
                    cache_similarity: None,
                    provider_selected: provider,
                    response_text: None,
                    usage: TokenUsage::default(),
                    actual_cost_usd: 0.0,
                    latency: started.elapsed(),
                    provider_elapsed: None,
                    degradations,
                    error: Some(error),
                    created_at: Utc::now(),
                };
                self.complete(decision)
            }
        }
    }

    /// Embed the query text under the configured timeout.
    ///
    /// Any failure is recorded as `EmbeddingUnavailable` and yields `None`,
    /// which forces a miss and skips the insert.
    async fn embed(&self, query: &Query, degradations: &mut Vec<Degradation>) -> Option<Vec<f32>> {
        let embedder = self.embedder.as_ref()?;
        match tokio::time::timeout(self.embedding_timeout, embedder.embed(&query.text)).await {
            Ok(Ok(vector)) if vector.iter().any(|v| !v.is_finite()) => {
                warn!(query_id = %query.id, "embedding has non-finite values, cache bypassed");
                degrade(degradations, Degradation::EmbeddingUnavailable);
                None
            }
            Ok(Ok(vector)) if !vector.is_empty() && vector.len() == embedder.dimensions() => {
                Some(vector)
            }
            Ok(Ok(vector)) => {
                warn!(
                    query_id = %query.id,
                    expected = embedder.dimensions(),
                    actual = vector.len(),
                    "embedding has the wrong dimensionality, cache bypassed"
                );
                degrade(degradations, Degradation::EmbeddingUnavailable);
                None
            }
            Ok(Err(e)) => {
                warn!(query_id = %query.id, error = %e, "embedding failed, cache bypassed");
                degrade(degradations, Degradation::EmbeddingUnavailable);
                None
            }
            Err(_) => {
                warn!(
                    query_id = %query.id,
                    timeout_ms = self.embedding_timeout.as_millis() as u64,
                    "embedding timed out, cache bypassed"
                );
                degrade(degradations, Degradation::EmbeddingUnavailable);
                None
            }
        }
    }

    async fn invoke(
        &self,
        snapshot: &RoutingSnapshot,
        provider: &str,
        tier: Tier,
        prompt: &str,
    ) -> Result<ProviderResponse, DecisionError> {
        let Some(adapter) = self.providers.get(provider) else {
            return Err(DecisionError::ProviderInvocationFailed {
                provider: provider.to_string(),
                message: "no adapter registered for provider".to_string(),
            });
        };

        let request = ProviderRequest {
            provider: provider.to_string(),
            model: snapshot.pricing.model_for(provider).to_string(),
            prompt: prompt.to_string(),
            tier,
        };
        let after = Duration::from_secs(snapshot.routing.provider_timeout_secs);
        debug!(provider, model = %request.model, "invoking provider");

        match tokio::time::timeout(after, adapter.invoke(request)).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => Err(DecisionError::ProviderInvocationFailed {
                provider: provider.to_string(),
                message: e.to_string(),
            }),
            Err(_) => Err(DecisionError::ProviderTimeout {
                provider: provider.to_string(),
                after,
            }),
        }
    }

    /// Local providers are free. Otherwise a sane provider-reported cost wins over the table.
    fn actual_cost(
        &self,
        snapshot: &RoutingSnapshot,
        provider: &str,
        response: &ProviderResponse,
    ) -> f64 {
        if snapshot.pricing.is_local(provider) {
            return 0.0;
        }
        response
            .cost_usd
            .filter(|cost| cost.is_finite() && *cost >= 0.0)
            .unwrap_or_else(|| snapshot.pricing.cost(provider, &response.usage))
    }

    fn hit_decision(
        &self,
        snapshot: &RoutingSnapshot,
        query: &Query,
        tier: Tier,
        hit: CacheHit,
        degradations: Vec<Degradation>,
        started: Instant,
    ) -> RoutingDecision {
        let entry = hit.entry;
        debug!(
            query_id = %query.id,
            similarity = hit.similarity,
            key = %entry.key,
            "cache hit"
        );
        RoutingDecision {
            query_id: query.id.clone(),
            tier,
            was_cache_hit: true,
            cache_similarity: Some(hit.similarity),
            provider_selected: entry.provider_used.clone(),
            response_text: Some(entry.response_text.clone()),
            usage: TokenUsage::default(),
            actual_cost_usd: 0.0,
            baseline_cost_usd: snapshot.baseline_cost(&query.text, Some(&entry.response_text)),
            latency: started.elapsed(),
            provider_elapsed: None,
            degradations,
            error: None,
            created_at: Utc::now(),
        }
    }

    /// Record the decision in the ledger and metrics, then hand it back.
    fn complete(&self, decision: RoutingDecision) -> RoutingDecision {
        if let Err(e) = self.ledger.record(&decision) {
            debug!(error = %e, "decision not added to ledger");
        }
        frugal_prometheus::record_decision(&decision);
        info!(
            query_id = %decision.query_id,
            tier = %decision.tier,
            provider = %decision.provider_selected,
            cache_hit = decision.was_cache_hit,
            error = decision.is_error(),
            actual_cost_usd = decision.actual_cost_usd,
            baseline_cost_usd = decision.baseline_cost_usd,
            latency_ms = decision.latency.as_millis() as u64,
            "query routed"
        );
        decision
    }
}

fn degrade(degradations: &mut Vec<Degradation>, degradation: Degradation) {
    if !degradations.contains(&degradation) {
        degradations.push(degradation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use frugal_config::model::{ProviderConfig, ProviderKind};
    use frugal_test_utils::{MockEmbedder, MockProvider};
    use tracing_test::traced_test;

    fn config() -> FrugalConfig {
        let mut config = FrugalConfig::default();
        config.routing.simple_provider = "mock".to_string();
        config.routing.medium_provider = "mock".to_string();
        config.routing.complex_provider = "gpt-4-turbo".to_string();
        config
    }

    #[test]
    fn builder_rejects_mismatched_dimensions() {
        let mut config = config();
        config.cache.dimensions = Some(8);
        let result = RoutingEngine::builder(config)
            .embedder(Arc::new(MockEmbedder::new(16)))
            .build();
        assert!(matches!(
            result,
            Err(FrugalError::DimensionMismatch {
                expected: 8,
                actual: 16
            })
        ));
    }

    #[test]
    fn builder_rejects_unusable_cache_bounds() {
        let mut zero_capacity = config();
        zero_capacity.cache.capacity = 0;
        assert!(matches!(
            RoutingEngine::builder(zero_capacity).build(),
            Err(FrugalError::Config(msg)) if msg.contains("cache.capacity")
        ));

        let mut zero_threshold = config();
        zero_threshold.cache.similarity_threshold = 0.0;
        assert!(matches!(
            RoutingEngine::builder(zero_threshold).build(),
            Err(FrugalError::Config(msg)) if msg.contains("cache.similarity_threshold")
        ));

        // The bounds only matter when there is a cache.
        let mut disabled = config();
        disabled.cache.enabled = false;
        disabled.cache.capacity = 0;
        assert!(RoutingEngine::builder(disabled).build().is_ok());
    }

    #[tokio::test]
    async fn non_finite_embedding_bypasses_the_cache() {
        let embedder = Arc::new(MockEmbedder::new(4));
        embedder.set_vector("What is Python?", vec![f32::NAN, 1.0, 0.0, 0.0]);
        let mut config = config();
        config.cache.dimensions = Some(4);
        let engine = RoutingEngine::builder(config)
            .embedder(embedder)
            .provider("mock", Arc::new(MockProvider::new()))
            .build()
            .unwrap();

        for _ in 0..2 {
            let decision = engine.route(Query::new("What is Python?")).await;
            assert!(!decision.is_error());
            assert!(!decision.was_cache_hit);
            assert_eq!(decision.degradations, vec![Degradation::EmbeddingUnavailable]);
        }
        assert!(engine.cache().unwrap().is_empty());
    }

    #[test]
    fn disabled_cache_builds_without_embedder() {
        let mut config = config();
        config.cache.enabled = false;
        let engine = RoutingEngine::builder(config).build().unwrap();
        assert!(engine.cache().is_none());
    }

    #[test]
    fn forced_provider_beats_tier_mapping() {
        let mut config = config();
        config.routing.force_provider = Some("gpt-3.5-turbo".to_string());
        let snapshot = RoutingSnapshot::from_config(&config).unwrap();

        let query = Query::new("hi");
        assert_eq!(snapshot.select_provider(&query, Tier::Simple), "gpt-3.5-turbo");

        let query = Query::new("hi").force_provider("claude-3-opus");
        assert_eq!(snapshot.select_provider(&query, Tier::Simple), "claude-3-opus");
    }

    #[test]
    fn provider_cost_is_ignored_for_local_and_used_for_cloud() {
        let mut config = config();
        config
            .providers
            .insert("metered".to_string(), ProviderConfig {
                kind: ProviderKind::Cloud,
                model: None,
                input_per_1k: 1.0,
                output_per_1k: 1.0,
            });
        let engine = RoutingEngine::builder(config.clone()).build().unwrap();
        let snapshot = RoutingSnapshot::from_config(&config).unwrap();
        let response = ProviderResponse {
            content: "ok".to_string(),
            usage: TokenUsage::new(1000, 1000),
            elapsed: Duration::from_millis(5),
            cost_usd: Some(0.5),
        };

        assert_eq!(engine.actual_cost(&snapshot, "mock", &response), 0.0);
        assert_eq!(engine.actual_cost(&snapshot, "metered", &response), 0.5);

        let unreported = ProviderResponse {
            cost_usd: Some(f64::NAN),
            ..response
        };
        assert!((engine.actual_cost(&snapshot, "metered", &unreported) - 2.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn reload_swaps_the_mapping() {
        let provider = Arc::new(MockProvider::new());
        let engine = RoutingEngine::builder(config())
            .provider("mock", provider.clone())
            .provider("ollama/llama3.2", provider.clone())
            .build()
            .unwrap();

        let first = engine.route(Query::new("What is Python?").skip_cache()).await;
        assert_eq!(first.provider_selected, "mock");

        let mut next = config();
        next.routing.simple_provider = "ollama/llama3.2".to_string();
        engine.reload(&next).unwrap();

        let second = engine.route(Query::new("What is Python?").skip_cache()).await;
        assert_eq!(second.provider_selected, "ollama/llama3.2");
        assert_eq!(provider.call_count(), 2);
    }

    #[test]
    fn failed_reload_keeps_previous_snapshot() {
        let engine = RoutingEngine::builder(config()).build().unwrap();
        let mut broken = config();
        broken.routing.reference_provider = "missing".to_string();
        assert!(engine.reload(&broken).is_err());
        assert_eq!(engine.snapshot().pricing().reference(), "gpt-4");
    }

    #[tokio::test]
    async fn unregistered_provider_is_an_invocation_failure() {
        let engine = RoutingEngine::builder(config()).build().unwrap();
        let decision = engine.route(Query::new("What is Python?")).await;
        let error = decision.error.expect("expected a provider error");
        assert!(error.is_invocation_failure());
        assert!(!error.is_timeout());
        assert_eq!(error.provider(), "mock");
        assert!(decision.response_text.is_none());
        assert_eq!(decision.actual_cost_usd, 0.0);
    }

    #[tokio::test]
    #[traced_test]
    async fn embedding_failure_degrades_and_logs() {
        let embedder = Arc::new(MockEmbedder::new(DEFAULT_DIMENSIONS));
        embedder.set_available(false);
        let engine = RoutingEngine::builder(config())
            .embedder(embedder)
            .provider("mock", Arc::new(MockProvider::new()))
            .build()
            .unwrap();

        let decision = engine.route(Query::new("What is Python?")).await;
        assert!(!decision.is_error());
        assert_eq!(decision.degradations, vec![Degradation::EmbeddingUnavailable]);
        assert!(engine.cache().unwrap().is_empty());
        assert!(logs_contain("embedding failed, cache bypassed"));
    }

    #[test]
    fn degradations_are_not_duplicated() {
        let mut list = Vec::new();
        degrade(&mut list, Degradation::CacheUnavailable);
        degrade(&mut list, Degradation::CacheUnavailable);
        assert_eq!(list, vec![Degradation::CacheUnavailable]);
    }
}
