//! # Property-Based Tests for Domain Value Objects
//!
//! Property tests for the gas and block-interval arithmetic.
//!
//! # Test Categories
//!
//! - **Scaling**: percentage multipliers floor and never overflow
//! - **Quotes**: the comparable price picks the right field
//! - **Intervals**: the rollover guard depends only on the window offset

#![allow(clippy::unwrap_used)]

use proptest::prelude::*;

use super::block_interval::{BlockInterval, SELECTOR_WINDOW};
use super::gas::{GasPriceQuote, WEI_PER_GWEI, gwei_to_wei, scale_percent};
use ethers::types::U256;

// ============================================================================
// Strategy Definitions
// ============================================================================

fn wei() -> impl Strategy<Value = u64> {
    0u64..1_000_000_000_000_000
}

fn percent() -> impl Strategy<Value = u64> {
    0u64..1_000
}

// ============================================================================
// Scaling
// ============================================================================

proptest! {
    #[test]
    fn scale_percent_is_floored_division(value in wei(), pct in percent()) {
        let scaled = scale_percent(U256::from(value), pct);
        let expected = u128::from(value) * u128::from(pct) / 100;
        prop_assert_eq!(scaled, U256::from(expected));
    }

    #[test]
    fn scale_by_hundred_is_identity(value in wei()) {
        prop_assert_eq!(scale_percent(U256::from(value), 100), U256::from(value));
    }

    #[test]
    fn scale_above_hundred_never_shrinks(value in wei(), pct in 100u64..1_000) {
        prop_assert!(scale_percent(U256::from(value), pct) >= U256::from(value));
    }

    #[test]
    fn scale_saturates_instead_of_overflowing(pct in 101u64..1_000) {
        let scaled = scale_percent(U256::MAX, pct);
        prop_assert_eq!(scaled, U256::MAX / U256::from(100u64));
    }

    #[test]
    fn gwei_conversion_is_linear(gwei in 0u64..10_000_000) {
        prop_assert_eq!(
            gwei_to_wei(gwei),
            U256::from(gwei) * U256::from(WEI_PER_GWEI)
        );
    }
}

// ============================================================================
// Quotes
// ============================================================================

proptest! {
    #[test]
    fn comparable_price_prefers_max_fee(max_fee in wei(), tip in wei()) {
        let quote = GasPriceQuote::eip1559(U256::from(max_fee), U256::from(tip));
        prop_assert!(quote.is_eip1559());
        prop_assert_eq!(quote.comparable_price(), U256::from(max_fee));
    }

    #[test]
    fn comparable_price_of_legacy_is_the_price(price in wei()) {
        let quote = GasPriceQuote::legacy(U256::from(price));
        prop_assert!(!quote.is_eip1559());
        prop_assert_eq!(quote.comparable_price(), U256::from(price));
    }
}

// ============================================================================
// Intervals
// ============================================================================

proptest! {
    #[test]
    fn rollover_guard_depends_on_offset_only(windows in 0u64..1_000_000, offset in 0u64..SELECTOR_WINDOW) {
        let interval = BlockInterval::new(
            U256::from(windows) * U256::from(SELECTOR_WINDOW) + U256::from(offset),
        );
        prop_assert_eq!(interval.window_offset(), offset);
        prop_assert_eq!(interval.is_in_rollover_window(), offset == 0 || offset >= 254);
    }

    #[test]
    fn between_saturates_at_zero(current in wei(), goal in wei()) {
        let interval = BlockInterval::between(U256::from(current), U256::from(goal));
        prop_assert_eq!(interval.get(), U256::from(current.saturating_sub(goal)));
    }
}
