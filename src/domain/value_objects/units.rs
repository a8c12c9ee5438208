//! # Token Units
//!
//! Formatting helpers for 18-decimal amounts (CTSI and ETH).

use ethers::types::U256;
use ethers::utils::format_ether;

/// Formats an 18-decimal CTSI amount.
#[must_use]
pub fn format_ctsi(amount: U256) -> String {
    format_ether(amount)
}

/// Converts an 18-decimal amount to `f64` for gauges. Precision loss is accepted.
#[must_use]
pub fn to_f64_units(amount: U256) -> f64 {
    format_ether(amount).parse().unwrap_or(f64::MAX)
}
