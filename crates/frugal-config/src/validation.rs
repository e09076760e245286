// SPDX-FileCopyrightText: 2026 Frugal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes:
//! ordered tier thresholds, compilable patterns, a well-formed signal table,
//! providers that exist, and cache bounds.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::{FrugalConfig, ProviderKind};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &FrugalConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.service.log_level.as_str()) {
        errors.push(ConfigError::validation(format!(
            "service.log_level must be one of {}, got `{}`",
            LOG_LEVELS.join(", "),
            config.service.log_level
        )));
    }

    validate_classifier(config, &mut errors);
    validate_routing(config, &mut errors);
    validate_cache(config, &mut errors);
    validate_providers(config, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_classifier(config: &FrugalConfig, errors: &mut Vec<ConfigError>) {
    let classifier = &config.classifier;

    if classifier.simple_max_score >= classifier.medium_max_score {
        errors.push(ConfigError::validation(format!(
            "classifier.simple_max_score ({}) must be less than classifier.medium_max_score ({})",
            classifier.simple_max_score, classifier.medium_max_score
        )));
    }

    if classifier.max_scan_bytes == 0 {
        errors.push(ConfigError::validation(
            "classifier.max_scan_bytes must be greater than 0",
        ));
    }

    for (key, terms) in [
        ("classifier.technical_terms", &classifier.technical_terms),
        ("classifier.system_design_terms", &classifier.system_design_terms),
    ] {
        if let Some(i) = terms.iter().position(|t| t.trim().is_empty()) {
            errors.push(ConfigError::validation(format!(
                "{key}[{i}] must not be empty"
            )));
        }
    }

    for (key, patterns) in [
        ("classifier.reasoning_cues", &classifier.reasoning_cues),
        ("classifier.code_patterns", &classifier.code_patterns),
        ("classifier.multi_step_patterns", &classifier.multi_step_patterns),
    ] {
        for pattern in patterns {
            if let Err(e) = regex::RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
            {
                errors.push(ConfigError::InvalidPattern {
                    key: key.to_string(),
                    pattern: pattern.clone(),
                    detail: e.to_string(),
                });
            }
        }
    }

    let mut seen_features = HashSet::new();
    for (i, rule) in classifier.signals.iter().enumerate() {
        if !seen_features.insert(rule.feature) {
            errors.push(ConfigError::validation(format!(
                "classifier.signals[{i}]: feature `{}` already has a signal group",
                rule.feature
            )));
        }
        if rule.bands.is_empty() {
            errors.push(ConfigError::validation(format!(
                "classifier.signals[{i}] must have at least one band"
            )));
        }
        for pair in rule.bands.windows(2) {
            if pair[1].at_least <= pair[0].at_least {
                errors.push(ConfigError::validation(format!(
                    "classifier.signals[{i}]: band `{}` must have a higher at_least than `{}`",
                    pair[1].name, pair[0].name
                )));
            }
        }
        for band in &rule.bands {
            if band.name.trim().is_empty() {
                errors.push(ConfigError::validation(format!(
                    "classifier.signals[{i}]: band names must not be empty"
                )));
            }
            if band.at_least == 0 {
                errors.push(ConfigError::validation(format!(
                    "classifier.signals[{i}]: band `{}` must have at_least >= 1",
                    band.name
                )));
            }
        }
    }
}

fn validate_routing(config: &FrugalConfig, errors: &mut Vec<ConfigError>) {
    let routing = &config.routing;

    let mut mapped = vec![
        ("routing.simple_provider", routing.simple_provider.as_str()),
        ("routing.medium_provider", routing.medium_provider.as_str()),
        ("routing.complex_provider", routing.complex_provider.as_str()),
        (
            "routing.reference_provider",
            routing.reference_provider.as_str(),
        ),
    ];
    if let Some(forced) = &routing.force_provider {
        mapped.push(("routing.force_provider", forced.as_str()));
    }

    for (key, provider) in mapped {
        if !config.providers.contains_key(provider) {
            errors.push(ConfigError::validation(format!(
                "{key} `{provider}` is not defined in [providers]"
            )));
        }
    }

    if routing.provider_timeout_secs == 0 {
        errors.push(ConfigError::validation(
            "routing.provider_timeout_secs must be greater than 0",
        ));
    }
}

fn validate_cache(config: &FrugalConfig, errors: &mut Vec<ConfigError>) {
    let cache = &config.cache;

    let threshold = cache.similarity_threshold;
    if !(threshold > 0.0 && threshold <= 1.0) {
        errors.push(ConfigError::validation(format!(
            "cache.similarity_threshold must be in (0.0, 1.0], got {}",
            cache.similarity_threshold
        )));
    }

    if cache.ttl_secs == 0 {
        errors.push(ConfigError::validation(
            "cache.ttl_secs must be greater than 0",
        ));
    }

    if cache.capacity == 0 {
        errors.push(ConfigError::validation(
            "cache.capacity must be greater than 0",
        ));
    }

    if cache.embedding_timeout_ms == 0 {
        errors.push(ConfigError::validation(
            "cache.embedding_timeout_ms must be greater than 0",
        ));
    }

    if cache.dimensions == Some(0) {
        errors.push(ConfigError::validation(
            "cache.dimensions must be greater than 0 when set",
        ));
    }
}

fn validate_providers(config: &FrugalConfig, errors: &mut Vec<ConfigError>) {
    for (id, provider) in &config.providers {
        for (field, price) in [
            ("input_per_1k", provider.input_per_1k),
            ("output_per_1k", provider.output_per_1k),
        ] {
            if !price.is_finite() || price < 0.0 {
                errors.push(ConfigError::validation(format!(
                    "providers.\"{id}\".{field} must be a non-negative number, got {price}"
                )));
            }
        }

        if provider.kind == ProviderKind::Local
            && (provider.input_per_1k > 0.0 || provider.output_per_1k > 0.0)
        {
            errors.push(ConfigError::validation(format!(
                "providers.\"{id}\" is local and must not have a price"
            )));
        }
    }
}
