// SPDX-FileCopyrightText: 2026 Frugal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Frugal router.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Top-level Frugal configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FrugalConfig {
    /// Service identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Complexity classifier rule table.
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Tier-to-provider mapping and invocation policy.
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Semantic response cache policy.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Known providers keyed by id, with their kind and pricing.
    #[serde(default = "default_providers")]
    pub providers: BTreeMap<String, ProviderConfig>,
}

impl Default for FrugalConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            classifier: ClassifierConfig::default(),
            routing: RoutingConfig::default(),
            cache: CacheConfig::default(),
            providers: default_providers(),
        }
    }
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "frugal".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// A measurable property of query text that a signal rule can score.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Whitespace-separated word count.
    WordCount,
    /// Number of code patterns that match.
    CodePatterns,
    /// Number of reasoning cue patterns that match.
    ReasoningCues,
    /// Number of distinct technical terms present.
    TechnicalTerms,
    /// Number of distinct system-design terms present.
    SystemDesignTerms,
    /// Number of multi-step patterns that match.
    MultiStep,
    /// Non-empty sentence count.
    SentenceCount,
}

/// One scoring threshold within a signal group.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SignalBand {
    /// Signal name reported when this band is the one that fires.
    pub name: String,
    /// Minimum feature value for this band.
    pub at_least: u32,
    /// Score contributed when this is the highest band reached.
    pub score: u32,
}

/// A signal group: a feature plus superseding score bands.
///
/// Only the highest band whose `at_least` is reached contributes.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SignalRule {
    pub feature: Feature,
    pub bands: Vec<SignalBand>,
}

impl SignalRule {
    fn new(feature: Feature, bands: &[(&str, u32, u32)]) -> Self {
        Self {
            feature,
            bands: bands
                .iter()
                .map(|&(name, at_least, score)| SignalBand {
                    name: name.to_string(),
                    at_least,
                    score,
                })
                .collect(),
        }
    }
}

/// Complexity classifier configuration.
///
/// Term lists are matched case-insensitively as whole words or phrases.
/// Cue and pattern lists are regular expressions, compiled case-insensitively.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ClassifierConfig {
    /// Highest score still classified as simple.
    #[serde(default = "default_simple_max_score")]
    pub simple_max_score: u32,

    /// Highest score still classified as medium. Anything above is complex.
    #[serde(default = "default_medium_max_score")]
    pub medium_max_score: u32,

    /// Inputs longer than this are truncated before scanning.
    #[serde(default = "default_max_scan_bytes")]
    pub max_scan_bytes: usize,

    #[serde(default = "default_technical_terms")]
    pub technical_terms: Vec<String>,

    #[serde(default = "default_system_design_terms")]
    pub system_design_terms: Vec<String>,

    #[serde(default = "default_reasoning_cues")]
    pub reasoning_cues: Vec<String>,

    #[serde(default = "default_code_patterns")]
    pub code_patterns: Vec<String>,

    #[serde(default = "default_multi_step_patterns")]
    pub multi_step_patterns: Vec<String>,

    /// The scoring table.
    #[serde(default = "default_signals")]
    pub signals: Vec<SignalRule>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            simple_max_score: default_simple_max_score(),
            medium_max_score: default_medium_max_score(),
            max_scan_bytes: default_max_scan_bytes(),
            technical_terms: default_technical_terms(),
            system_design_terms: default_system_design_terms(),
            reasoning_cues: default_reasoning_cues(),
            code_patterns: default_code_patterns(),
            multi_step_patterns: default_multi_step_patterns(),
            signals: default_signals(),
        }
    }
}

fn default_simple_max_score() -> u32 {
    1
}

fn default_medium_max_score() -> u32 {
    3
}

fn default_max_scan_bytes() -> usize {
    64 * 1024
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_technical_terms() -> Vec<String> {
    strings(&[
        // programming
        "algorithm",
        "recursion",
        "polymorphism",
        "inheritance",
        "encapsulation",
        "middleware",
        "microservices",
        "kubernetes",
        "docker",
        "api",
        "rest",
        "graphql",
        "database",
        "sql",
        "nosql",
        "cache",
        "redis",
        "async",
        "concurrent",
        "thread",
        "process",
        "memory",
        "garbage collection",
        "optimization",
        "complexity",
        "big-o",
        "data structure",
        "binary tree",
        "hash map",
        "linked list",
        "queue",
        "stack",
        "heap",
        "graph",
        // machine learning
        "machine learning",
        "neural network",
        "deep learning",
        "transformer",
        "attention mechanism",
        "gradient descent",
        "backpropagation",
        "embedding",
        "fine-tuning",
        "llm",
        "gpt",
        "bert",
        "tokenization",
        "vector",
        // distributed systems
        "scalability",
        "load balancer",
        "sharding",
        "replication",
        "consistency",
        "availability",
        "partition tolerance",
        "cap theorem",
        "distributed",
        "consensus",
        "raft",
        "paxos",
        "eventual consistency",
        "latency",
        "throughput",
        "fault tolerance",
        "failover",
        "redundancy",
        // security
        "encryption",
        "authentication",
        "authorization",
        "oauth",
        "jwt",
        "ssl",
        "tls",
        "vulnerability",
        "injection",
        "xss",
        "csrf",
    ])
}

fn default_system_design_terms() -> Vec<String> {
    strings(&[
        "design",
        "architect",
        "scale",
        "million",
        "billion",
        "distributed",
        "high availability",
        "fault tolerant",
        "load balance",
        "microservice",
        "tradeoff",
        "trade-off",
        "system design",
        "architecture",
        "requests per second",
        "rps",
        "qps",
        "queries per second",
        "database schema",
        "api design",
        "caching strategy",
        "message queue",
    ])
}

fn default_reasoning_cues() -> Vec<String> {
    strings(&[
        r"\bwhy\b",
        r"\bhow\s+(?:does|do|can|could|would|should)\b",
        r"\bexplain\b",
        r"\banalyze\b",
        r"\bcompare\b",
        r"\bcontrast\b",
        r"\bevaluate\b",
        r"\bdesign\b",
        r"\barchitect\b",
        r"\bimplement\b",
        r"\boptimize\b",
        r"\bdebug\b",
        r"\btroubleshoot\b",
        r"\bwhat\s+(?:are|is)\s+the\s+(?:best|optimal|most\s+efficient)\b",
        r"\btradeoff\b",
        r"\btrade-off\b",
    ])
}

fn default_code_patterns() -> Vec<String> {
    strings(&[
        r"```",
        r"\bdef\s+\w+\s*\(",
        r"\bclass\s+\w+",
        r"\bfunction\s+\w+",
        r"\bconst\s+\w+\s*=",
        r"\blet\s+\w+\s*=",
        r"\bvar\s+\w+\s*=",
        r"\bimport\s+",
        r"\bfrom\s+\w+\s+import\b",
        r"\breturn\s+",
        r"<[a-zA-Z][^>]*>",
        r#"\{\s*"?\w+"?\s*:"#,
    ])
}

fn default_multi_step_patterns() -> Vec<String> {
    strings(&[
        r"\bfirst\b.*\bthen\b",
        r"\bstep\s*(?:by\s*step|1|one)\b",
        r"\bafter\s+that\b",
        r"\bfinally\b",
        r"\bnext\b",
        r"\bfollow(?:ing|ed)\s+by\b",
        r"\band\s+then\b",
    ])
}

fn default_signals() -> Vec<SignalRule> {
    vec![
        SignalRule::new(
            Feature::WordCount,
            &[("long_query", 31, 1), ("very_long_query", 101, 2)],
        ),
        SignalRule::new(Feature::CodePatterns, &[("code_present", 1, 2)]),
        SignalRule::new(
            Feature::ReasoningCues,
            &[("reasoning", 1, 1), ("deep_reasoning", 3, 2)],
        ),
        SignalRule::new(
            Feature::TechnicalTerms,
            &[("technical_vocabulary", 2, 1), ("technical_depth", 5, 2)],
        ),
        SignalRule::new(
            Feature::SystemDesignTerms,
            &[("system_design", 1, 2), ("system_design_heavy", 3, 3)],
        ),
        SignalRule::new(Feature::MultiStep, &[("multi_step", 1, 1)]),
        SignalRule::new(Feature::SentenceCount, &[("multi_sentence", 4, 1)]),
    ]
}

/// Tier-to-provider mapping and invocation policy.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RoutingConfig {
    /// When false, every query goes to `medium_provider`. Classification still runs.
    #[serde(default = "default_routing_enabled")]
    pub enabled: bool,

    /// Send every query to this provider, bypassing the tier mapping.
    #[serde(default)]
    pub force_provider: Option<String>,

    #[serde(default = "default_simple_provider")]
    pub simple_provider: String,

    #[serde(default = "default_medium_provider")]
    pub medium_provider: String,

    #[serde(default = "default_complex_provider")]
    pub complex_provider: String,

    /// Provider whose pricing defines the baseline cost of every decision.
    #[serde(default = "default_reference_provider")]
    pub reference_provider: String,

    /// Upper bound on a single provider invocation.
    #[serde(default = "default_provider_timeout_secs")]
    pub provider_timeout_secs: u64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            enabled: default_routing_enabled(),
            force_provider: None,
            simple_provider: default_simple_provider(),
            medium_provider: default_medium_provider(),
            complex_provider: default_complex_provider(),
            reference_provider: default_reference_provider(),
            provider_timeout_secs: default_provider_timeout_secs(),
        }
    }
}

fn default_routing_enabled() -> bool {
    true
}

fn default_simple_provider() -> String {
    "ollama/llama3.2".to_string()
}

fn default_medium_provider() -> String {
    "ollama/llama3.2".to_string()
}

fn default_complex_provider() -> String {
    "gpt-4-turbo".to_string()
}

fn default_reference_provider() -> String {
    "gpt-4".to_string()
}

fn default_provider_timeout_secs() -> u64 {
    300
}

/// Order in which entries are evicted when the cache is full.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EvictionPolicy {
    /// Least recently inserted or accessed.
    #[default]
    Lru,
    /// Oldest insertion, regardless of access.
    Fifo,
}

/// Semantic response cache configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,

    /// Minimum cosine similarity for a hit.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    /// Entry time-to-live from creation, in seconds.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Hard bound on stored entries.
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    #[serde(default)]
    pub eviction: EvictionPolicy,

    /// Only serve entries created for the same tier.
    #[serde(default = "default_tier_isolation")]
    pub tier_isolation: bool,

    /// Upper bound on one embedding call before the lookup is a forced miss.
    #[serde(default = "default_embedding_timeout_ms")]
    pub embedding_timeout_ms: u64,

    /// Expected embedding dimensionality. When unset, the first insert fixes it.
    #[serde(default)]
    pub dimensions: Option<usize>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            similarity_threshold: default_similarity_threshold(),
            ttl_secs: default_ttl_secs(),
            capacity: default_capacity(),
            eviction: EvictionPolicy::default(),
            tier_isolation: default_tier_isolation(),
            embedding_timeout_ms: default_embedding_timeout_ms(),
            dimensions: None,
        }
    }
}

fn default_cache_enabled() -> bool {
    true
}

fn default_similarity_threshold() -> f32 {
    0.92
}

fn default_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn default_capacity() -> usize {
    10_000
}

fn default_tier_isolation() -> bool {
    true
}

fn default_embedding_timeout_ms() -> u64 {
    2_000
}

/// Where a provider runs. Local providers never incur cost.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Local,
    Cloud,
}

/// A provider entry: kind, model name, and price per 1K tokens in USD.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    pub kind: ProviderKind,

    /// Model name sent to the provider. Defaults to the provider id.
    #[serde(default)]
    pub model: Option<String>,

    #[serde(default)]
    pub input_per_1k: f64,

    #[serde(default)]
    pub output_per_1k: f64,
}

impl ProviderConfig {
    fn cloud(input_per_1k: f64, output_per_1k: f64) -> Self {
        Self {
            kind: ProviderKind::Cloud,
            model: None,
            input_per_1k,
            output_per_1k,
        }
    }

    fn local() -> Self {
        Self {
            kind: ProviderKind::Local,
            model: None,
            input_per_1k: 0.0,
            output_per_1k: 0.0,
        }
    }
}

/// Default provider table: reference cloud models plus free local models.
pub fn default_providers() -> BTreeMap<String, ProviderConfig> {
    let mut providers = BTreeMap::new();
    providers.insert("gpt-4".to_string(), ProviderConfig::cloud(0.03, 0.06));
    providers.insert("gpt-4-turbo".to_string(), ProviderConfig::cloud(0.01, 0.03));
    providers.insert(
        "gpt-3.5-turbo".to_string(),
        ProviderConfig::cloud(0.0005, 0.0015),
    );
    providers.insert(
        "claude-3-opus".to_string(),
        ProviderConfig::cloud(0.015, 0.075),
    );
    providers.insert(
        "claude-3-sonnet".to_string(),
        ProviderConfig::cloud(0.003, 0.015),
    );
    for local in [
        "ollama/llama3.2",
        "ollama/llama3",
        "ollama/mistral",
        "ollama/phi3",
        "ollama/tinyllama",
        "ollama/codellama",
        "mock",
    ] {
        providers.insert(local.to_string(), ProviderConfig::local());
    }
    providers
}

impl RoutingConfig {
    /// Provider id configured for a tier, honoring `enabled`.
    pub fn provider_for_tier(&self, tier: frugal_core::Tier) -> &str {
        use frugal_core::Tier;

        if !self.enabled {
            return &self.medium_provider;
        }
        match tier {
            Tier::Simple => &self.simple_provider,
            Tier::Medium => &self.medium_provider,
            Tier::Complex => &self.complex_provider,
        }
    }
}
