// SPDX-FileCopyrightText: 2026 Frugal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider pricing tables and cost calculation.
//!
//! Prices are USD per 1K tokens, taken from the `[providers]` configuration.
//! Defaults:
//!
//! gpt-4:           input=$0.03/1K,   output=$0.06/1K (reference)
//! gpt-4-turbo:     input=$0.01/1K,   output=$0.03/1K
//! gpt-3.5-turbo:   input=$0.0005/1K, output=$0.0015/1K
//! claude-3-opus:   input=$0.015/1K,  output=$0.075/1K
//! claude-3-sonnet: input=$0.003/1K,  output=$0.015/1K
//! ollama/* and mock are local and free.

use std::collections::HashMap;

use frugal_config::FrugalConfig;
use frugal_config::model::ProviderKind;
use frugal_core::{FrugalError, TokenUsage};

/// Per-provider pricing in USD per thousand tokens.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelPricing {
    pub kind: ProviderKind,
    /// Model name sent to the provider.
    pub model: String,
    pub input_per_1k: f64,
    pub output_per_1k: f64,
}

impl ModelPricing {
    pub fn is_local(&self) -> bool {
        self.kind == ProviderKind::Local
    }
}

/// Calculate cost in USD for a given token usage and pricing.
///
/// Local providers always cost zero.
pub fn calculate_cost(usage: &TokenUsage, pricing: &ModelPricing) -> f64 {
    if pricing.is_local() {
        return 0.0;
    }
    let input = (f64::from(usage.input_tokens) / 1_000.0) * pricing.input_per_1k;
    let output = (f64::from(usage.output_tokens) / 1_000.0) * pricing.output_per_1k;
    input + output
}

/// Pricing for every configured provider plus the fixed reference provider.
#[derive(Debug, Clone)]
pub struct PricingTable {
    providers: HashMap<String, ModelPricing>,
    reference: String,
    reference_pricing: ModelPricing,
}

impl PricingTable {
    /// Build the table from configuration.
    ///
    /// Fails if the reference provider is not defined.
    pub fn from_config(config: &FrugalConfig) -> Result<Self, FrugalError> {
        let providers: HashMap<String, ModelPricing> = config
            .providers
            .iter()
            .map(|(id, p)| {
                (
                    id.clone(),
                    ModelPricing {
                        kind: p.kind,
                        model: p.model.clone().unwrap_or_else(|| id.clone()),
                        input_per_1k: p.input_per_1k,
                        output_per_1k: p.output_per_1k,
                    },
                )
            })
            .collect();

        let reference = config.routing.reference_provider.clone();
        let Some(reference_pricing) = providers.get(&reference).cloned() else {
            return Err(FrugalError::Config(format!(
                "reference provider `{reference}` has no pricing"
            )));
        };

        Ok(Self {
            providers,
            reference,
            reference_pricing,
        })
    }

    /// Id of the reference provider used for baseline cost.
    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn contains(&self, provider: &str) -> bool {
        self.providers.contains_key(provider)
    }

    /// Look up pricing for a provider.
    ///
    /// Falls back to reference pricing for unknown providers so cost
    /// tracking never silently drops records.
    pub fn get(&self, provider: &str) -> &ModelPricing {
        self.providers
            .get(provider)
            .unwrap_or_else(|| self.reference_pricing())
    }

    pub fn reference_pricing(&self) -> &ModelPricing {
        &self.reference_pricing
    }

    /// Model name for a provider id, or the id itself if unknown.
    pub fn model_for<'a>(&'a self, provider: &'a str) -> &'a str {
        self.providers
            .get(provider)
            .map(|p| p.model.as_str())
            .unwrap_or(provider)
    }

    /// Whether a provider is known to run locally at zero cost.
    pub fn is_local(&self, provider: &str) -> bool {
        self.providers.get(provider).is_some_and(ModelPricing::is_local)
    }

    /// Cost of `usage` on `provider`.
    pub fn cost(&self, provider: &str, usage: &TokenUsage) -> f64 {
        calculate_cost(usage, self.get(provider))
    }

    /// Cost the same usage would have incurred on the reference provider.
    pub fn baseline_cost(&self, usage: &TokenUsage) -> f64 {
        let reference = self.reference_pricing();
        // The baseline is a hypothetical cloud call even when the reference is local.
        let input = (f64::from(usage.input_tokens) / 1_000.0) * reference.input_per_1k;
        let output = (f64::from(usage.output_tokens) / 1_000.0) * reference.output_per_1k;
        input + output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> PricingTable {
        PricingTable::from_config(&FrugalConfig::default()).expect("default pricing")
    }

    #[test]
    fn gpt4_pricing() {
        let t = table();
        let p = t.get("gpt-4");
        assert!((p.input_per_1k - 0.03).abs() < f64::EPSILON);
        assert!((p.output_per_1k - 0.06).abs() < f64::EPSILON);
        assert_eq!(p.model, "gpt-4");
    }

    #[test]
    fn unknown_provider_falls_back_to_reference() {
        let t = table();
        assert_eq!(t.get("some-new-model"), t.get("gpt-4"));
        assert!(!t.is_local("some-new-model"));
        assert_eq!(t.model_for("some-new-model"), "some-new-model");
    }

    #[test]
    fn calculate_cost_per_thousand() {
        let t = table();
        let usage = TokenUsage::new(1_000, 500);
        // 1 * 0.03 + 0.5 * 0.06
        assert!((t.cost("gpt-4", &usage) - 0.06).abs() < 1e-12);
        // 1 * 0.01 + 0.5 * 0.03
        assert!((t.cost("gpt-4-turbo", &usage) - 0.025).abs() < 1e-12);
    }

    #[test]
    fn local_providers_are_free() {
        let t = table();
        let usage = TokenUsage::new(10_000, 10_000);
        assert!(t.is_local("ollama/llama3.2"));
        assert_eq!(t.cost("ollama/llama3.2", &usage), 0.0);
        assert_eq!(t.cost("mock", &usage), 0.0);
    }

    #[test]
    fn baseline_uses_reference() {
        let t = table();
        let usage = TokenUsage::new(200, 100);
        assert!((t.baseline_cost(&usage) - (0.2 * 0.03 + 0.1 * 0.06)).abs() < 1e-12);
        assert_eq!(t.reference(), "gpt-4");
    }

    #[test]
    fn missing_reference_is_a_config_error() {
        let mut config = FrugalConfig::default();
        config.routing.reference_provider = "nope".into();
        assert!(matches!(
            PricingTable::from_config(&config),
            Err(FrugalError::Config(_))
        ));
    }

    #[test]
    fn zero_usage_costs_nothing() {
        let t = table();
        assert_eq!(t.cost("gpt-4", &TokenUsage::default()), 0.0);
        assert_eq!(t.baseline_cost(&TokenUsage::default()), 0.0);
    }
}
