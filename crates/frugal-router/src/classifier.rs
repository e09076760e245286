// SPDX-FileCopyrightText: 2026 Frugal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Heuristic query complexity classifier.
//!
//! Extracts a fixed set of lexical features from the query text and scores
//! them against the configured signal table. Every pattern is compiled when
//! the rules are built, so classification itself cannot fail.

use std::collections::{BTreeMap, BTreeSet};

use regex::{RegexSet, RegexSetBuilder};
use serde::Serialize;

use frugal_config::model::{ClassifierConfig, Feature, SignalRule};
use frugal_core::{FrugalError, Tier, text};

/// Highest confidence ever reported.
const MAX_CONFIDENCE: f32 = 0.95;

/// Result of classifying one query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplexityResult {
    pub tier: Tier,
    pub score: u32,
    /// Names of the signal bands that contributed to the score.
    pub signals: BTreeSet<String>,
    /// Raw feature values the score was computed from.
    pub features: BTreeMap<Feature, u32>,
    pub confidence: f32,
    /// The text was truncated to the scan limit before scoring.
    pub degraded: bool,
}

/// Compiled classifier rules: term sets, patterns, the signal table and tier thresholds.
///
/// `classify` is a pure function of the text and these rules.
#[derive(Debug, Clone)]
pub struct ClassifierRules {
    simple_max_score: u32,
    medium_max_score: u32,
    max_scan_bytes: usize,
    technical_terms: RegexSet,
    system_design_terms: RegexSet,
    reasoning_cues: RegexSet,
    code_patterns: RegexSet,
    multi_step_patterns: RegexSet,
    signals: Vec<SignalRule>,
}

impl ClassifierRules {
    /// Compile the rules from configuration.
    pub fn from_config(config: &ClassifierConfig) -> Result<Self, FrugalError> {
        if config.simple_max_score >= config.medium_max_score {
            return Err(FrugalError::Config(format!(
                "classifier.simple_max_score ({}) must be below classifier.medium_max_score ({})",
                config.simple_max_score, config.medium_max_score
            )));
        }

        let mut signals = config.signals.clone();
        for rule in &mut signals {
            rule.bands.sort_by_key(|band| band.at_least);
        }

        Ok(Self {
            simple_max_score: config.simple_max_score,
            medium_max_score: config.medium_max_score,
            max_scan_bytes: config.max_scan_bytes,
            technical_terms: term_set("classifier.technical_terms", &config.technical_terms)?,
            system_design_terms: term_set(
                "classifier.system_design_terms",
                &config.system_design_terms,
            )?,
            reasoning_cues: pattern_set("classifier.reasoning_cues", &config.reasoning_cues)?,
            code_patterns: pattern_set("classifier.code_patterns", &config.code_patterns)?,
            multi_step_patterns: pattern_set(
                "classifier.multi_step_patterns",
                &config.multi_step_patterns,
            )?,
            signals,
        })
    }

    /// Classify a query text.
    pub fn classify(&self, input: &str) -> ComplexityResult {
        let (scanned, degraded) = truncate_to_boundary(input, self.max_scan_bytes);

        if scanned.trim().is_empty() {
            return ComplexityResult {
                tier: Tier::Simple,
                score: 0,
                signals: BTreeSet::new(),
                features: BTreeMap::new(),
                confidence: self.confidence(Tier::Simple, 0),
                degraded,
            };
        }

        let features = self.extract_features(scanned);

        let mut score = 0u32;
        let mut signals = BTreeSet::new();
        for rule in &self.signals {
            let value = features.get(&rule.feature).copied().unwrap_or(0);
            // Bands are sorted ascending, so the last one reached supersedes the rest.
            if let Some(band) = rule.bands.iter().rev().find(|b| value >= b.at_least) {
                score = score.saturating_add(band.score);
                signals.insert(band.name.clone());
            }
        }

        let tier = self.tier_for_score(score);
        ComplexityResult {
            tier,
            score,
            signals,
            features,
            confidence: self.confidence(tier, score),
            degraded,
        }
    }

    /// Map a score to a tier using the configured thresholds.
    pub fn tier_for_score(&self, score: u32) -> Tier {
        if score <= self.simple_max_score {
            Tier::Simple
        } else if score <= self.medium_max_score {
            Tier::Medium
        } else {
            Tier::Complex
        }
    }

    fn extract_features(&self, scanned: &str) -> BTreeMap<Feature, u32> {
        let count = |n: usize| u32::try_from(n).unwrap_or(u32::MAX);

        let mut features = BTreeMap::new();
        features.insert(Feature::WordCount, count(text::word_count(scanned)));
        features.insert(
            Feature::CodePatterns,
            count(self.code_patterns.matches(scanned).iter().count()),
        );
        features.insert(
            Feature::ReasoningCues,
            count(self.reasoning_cues.matches(scanned).iter().count()),
        );
        features.insert(
            Feature::TechnicalTerms,
            count(self.technical_terms.matches(scanned).iter().count()),
        );
        features.insert(
            Feature::SystemDesignTerms,
            count(self.system_design_terms.matches(scanned).iter().count()),
        );
        features.insert(
            Feature::MultiStep,
            count(self.multi_step_patterns.matches(scanned).iter().count()),
        );
        features.insert(Feature::SentenceCount, count(text::sentence_count(scanned)));
        features
    }

    fn confidence(&self, tier: Tier, score: u32) -> f32 {
        let medium_min = self.simple_max_score + 1;
        let complex_min = self.medium_max_score + 1;
        let step = |n: u32| 0.05 * n as f32;

        let confidence = match tier {
            Tier::Complex => 0.70 + step(score.saturating_sub(complex_min)),
            Tier::Medium => 0.75 + step(score.saturating_sub(medium_min)),
            Tier::Simple => 0.85 + step(medium_min.saturating_sub(score)),
        };
        confidence.min(MAX_CONFIDENCE)
    }
}

/// Truncate to at most `limit` bytes without splitting a character.
fn truncate_to_boundary(input: &str, limit: usize) -> (&str, bool) {
    if input.len() <= limit {
        return (input, false);
    }
    let mut end = limit;
    while !input.is_char_boundary(end) {
        end -= 1;
    }
    (&input[..end], true)
}

/// Whole-word, whitespace-tolerant pattern for a literal term or phrase.
fn term_pattern(term: &str) -> String {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let body = text::words(term)
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s+");

    let mut pattern = String::with_capacity(body.len() + 4);
    if term.trim_start().starts_with(is_word) {
        pattern.push_str(r"\b");
    }
    pattern.push_str(&body);
    if term.trim_end().ends_with(is_word) {
        pattern.push_str(r"\b");
    }
    pattern
}

fn term_set(key: &str, terms: &[String]) -> Result<RegexSet, FrugalError> {
    build_set(key, terms.iter().map(|t| term_pattern(t)))
}

fn pattern_set(key: &str, patterns: &[String]) -> Result<RegexSet, FrugalError> {
    build_set(key, patterns.iter().cloned())
}

fn build_set(
    key: &str,
    patterns: impl IntoIterator<Item = String>,
) -> Result<RegexSet, FrugalError> {
    RegexSetBuilder::new(patterns)
        .case_insensitive(true)
        .build()
        .map_err(|e| FrugalError::Config(format!("{key}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::LazyLock;

    static DEFAULT_RULES: LazyLock<ClassifierRules> =
        LazyLock::new(|| ClassifierRules::from_config(&ClassifierConfig::default()).unwrap());

    fn rules() -> &'static ClassifierRules {
        &DEFAULT_RULES
    }

    #[test]
    fn short_factual_question_is_simple() {
        let result = rules().classify("What is Python?");
        assert_eq!(result.score, 0);
        assert_eq!(result.tier, Tier::Simple);
        assert!(result.signals.is_empty());
        assert!(!result.degraded);
        assert!((result.confidence - 0.95).abs() < 1e-6);
    }

    #[test]
    fn empty_and_whitespace_are_simple() {
        let r = rules();
        for input in ["", "   ", "\n\t"] {
            let result = r.classify(input);
            assert_eq!(result.tier, Tier::Simple);
            assert_eq!(result.score, 0);
            assert!(result.signals.is_empty());
        }
    }

    #[test]
    fn explanation_with_technical_terms_is_medium() {
        let result = rules().classify("Explain the difference between REST and GraphQL APIs");
        assert_eq!(result.features[&Feature::ReasoningCues], 1);
        assert_eq!(result.features[&Feature::TechnicalTerms], 2);
        assert_eq!(result.score, 2);
        assert_eq!(result.tier, Tier::Medium);
        assert!(result.signals.contains("reasoning"));
        assert!(result.signals.contains("technical_vocabulary"));
    }

    #[test]
    fn system_design_question_is_complex() {
        let result = rules().classify(
            "Design a distributed cache system for a social media platform that handles \
             10 million requests per second with low latency and high availability",
        );
        assert!(result.score >= 5, "score was {}", result.score);
        assert_eq!(result.tier, Tier::Complex);
        assert!(result.signals.contains("system_design_heavy"));
        assert!(!result.signals.contains("system_design"));
    }

    #[test]
    fn long_system_design_prompt_scores_at_least_five() {
        let filler = "the service must keep working for every user in every region ".repeat(10);
        let prompt = format!(
            "We need to design the storage layer at large scale for a distributed product. {filler}"
        );
        assert!(text::word_count(&prompt) > 100);

        let result = rules().classify(&prompt);
        assert!(result.signals.contains("very_long_query"));
        assert!(result.signals.contains("system_design_heavy"));
        assert!(result.score >= 5);
        assert_eq!(result.tier, Tier::Complex);
    }

    #[test]
    fn code_block_counts_as_code() {
        let result = rules().classify("fix this\n```\ndef login(user):\n    return user\n```");
        assert!(result.features[&Feature::CodePatterns] >= 2);
        assert!(result.signals.contains("code_present"));
        assert_eq!(result.tier, Tier::Medium);
    }

    #[test]
    fn bands_supersede_within_a_group() {
        let result = rules().classify("why explain analyze compare");
        assert_eq!(result.features[&Feature::ReasoningCues], 4);
        assert!(result.signals.contains("deep_reasoning"));
        assert!(!result.signals.contains("reasoning"));
        assert_eq!(result.score, 2);
    }

    #[test]
    fn terms_match_whole_words_only() {
        let result = rules().classify("the rapids were restful");
        assert_eq!(result.features[&Feature::TechnicalTerms], 0);
        assert_eq!(result.features[&Feature::SystemDesignTerms], 0);
    }

    #[test]
    fn phrases_tolerate_extra_whitespace_and_case() {
        let result = rules().classify("tell me about Load   Balancer setups");
        assert_eq!(result.features[&Feature::TechnicalTerms], 1);
    }

    #[test]
    fn oversized_input_is_truncated_and_flagged() {
        let config = ClassifierConfig {
            max_scan_bytes: 16,
            ..ClassifierConfig::default()
        };
        let rules = ClassifierRules::from_config(&config).unwrap();
        let result = rules.classify("ééééééééééééééééééé design");
        assert!(result.degraded);
        assert_eq!(result.features[&Feature::SystemDesignTerms], 0);
    }

    #[test]
    fn invalid_pattern_is_a_config_error() {
        let config = ClassifierConfig {
            code_patterns: vec!["(unclosed".to_string()],
            ..ClassifierConfig::default()
        };
        let err = ClassifierRules::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("classifier.code_patterns"));
    }

    #[test]
    fn unordered_thresholds_are_rejected() {
        let config = ClassifierConfig {
            simple_max_score: 3,
            medium_max_score: 3,
            ..ClassifierConfig::default()
        };
        assert!(ClassifierRules::from_config(&config).is_err());
    }

    #[test]
    fn confidence_follows_distance_from_threshold() {
        let r = rules();
        assert!((r.confidence(Tier::Medium, 2) - 0.75).abs() < 1e-6);
        assert!((r.confidence(Tier::Medium, 3) - 0.80).abs() < 1e-6);
        assert!((r.confidence(Tier::Complex, 4) - 0.70).abs() < 1e-6);
        assert!((r.confidence(Tier::Complex, 20) - 0.95).abs() < 1e-6);
        assert!((r.confidence(Tier::Simple, 1) - 0.90).abs() < 1e-6);
    }

    #[test]
    fn result_serializes_with_snake_case_features() {
        let result = rules().classify("Explain the difference between REST and GraphQL APIs");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["tier"], "medium");
        assert_eq!(json["features"]["technical_terms"], 2);
        assert_eq!(json["features"]["word_count"], 8);
    }

    #[test]
    fn term_pattern_skips_boundaries_next_to_symbols() {
        assert_eq!(term_pattern("c++"), r"\bc\+\+");
        assert_eq!(term_pattern("big-o"), r"\bbig\-o\b");
        assert_eq!(term_pattern("hash map"), r"\bhash\s+map\b");
    }

    proptest! {
        #[test]
        fn classify_is_deterministic(input in "\\PC{0,200}") {
            let r = rules();
            prop_assert_eq!(r.classify(&input), r.classify(&input));
        }

        #[test]
        fn tier_is_monotonic_in_score(
            simple_max in 0u32..10,
            gap in 1u32..10,
            a in 0u32..40,
            b in 0u32..40,
        ) {
            // Only the thresholds matter here; empty term lists keep the build cheap.
            let config = ClassifierConfig {
                simple_max_score: simple_max,
                medium_max_score: simple_max + gap,
                technical_terms: Vec::new(),
                system_design_terms: Vec::new(),
                reasoning_cues: Vec::new(),
                code_patterns: Vec::new(),
                multi_step_patterns: Vec::new(),
                ..ClassifierConfig::default()
            };
            let r = ClassifierRules::from_config(&config).unwrap();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(r.tier_for_score(lo) <= r.tier_for_score(hi));
        }

        #[test]
        fn confidence_stays_in_range(input in "[a-z .?]{0,120}") {
            let result = rules().classify(&input);
            prop_assert!(result.confidence > 0.0 && result.confidence <= MAX_CONFIDENCE);
        }
    }
}
