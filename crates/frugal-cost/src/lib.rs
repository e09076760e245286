// SPDX-FileCopyrightText: 2026 Frugal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cost tracking for the Frugal router.
//!
//! Provides:
//! - [`PricingTable`]: per-provider prices and the reference baseline
//! - [`CostLedger`]: order-independent aggregation of routing decisions

pub mod ledger;
pub mod pricing;

pub use ledger::{CostLedger, DailyStats, LedgerRecord, LedgerSummary, TimeWindow};
pub use pricing::{ModelPricing, PricingTable, calculate_cost};
