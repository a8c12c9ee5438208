//! # Gas Pricing
//!
//! Gas-price quotes and the transaction overrides built from them.
//!
//! A [`GasPriceQuote`] is produced fresh for every transaction attempt and is
//! never cached across iterations. [`TransactionOverrides`] pairs a quote with
//! the optional gas limit and nonce that are set on the outgoing transaction.
//!
//! # Examples
//!
//! ```
//! use ethers::types::U256;
//! use pos_node::domain::value_objects::gas::{GasPriceQuote, gwei_to_wei};
//!
//! let quote = GasPriceQuote::eip1559(gwei_to_wei(52), gwei_to_wei(2));
//! assert_eq!(quote.comparable_price(), U256::from(52_000_000_000u64));
//! ```

use ethers::types::U256;
use ethers::utils::format_units;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Wei in one gwei.
pub const WEI_PER_GWEI: u64 = 1_000_000_000;

/// Wei in one decigwei (gwei / 10), the unit used by gas-station oracles.
pub const WEI_PER_DECIGWEI: u64 = 100_000_000;

/// Converts a whole gwei amount to wei.
#[inline]
#[must_use]
pub fn gwei_to_wei(gwei: u64) -> U256 {
    U256::from(gwei) * U256::from(WEI_PER_GWEI)
}

/// Formats a wei amount as a decimal gwei string.
#[must_use]
pub fn format_gwei(wei: U256) -> String {
    format_units(wei, "gwei").unwrap_or_else(|_| format!("{wei} wei"))
}

/// Scales `value` by an integer percentage (`value * percent / 100`, floored).
#[inline]
#[must_use]
pub fn scale_percent(value: U256, percent: u64) -> U256 {
    value.saturating_mul(U256::from(percent)) / U256::from(100u64)
}

/// A gas-price quote for a single transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GasPriceQuote {
    /// Pre-London single gas price.
    Legacy {
        /// Price per gas unit, in wei.
        gas_price: U256,
    },
    /// EIP-1559 fee pair.
    Eip1559 {
        /// Maximum total fee per gas, in wei.
        max_fee_per_gas: U256,
        /// Maximum tip per gas, in wei.
        max_priority_fee_per_gas: U256,
    },
}

impl GasPriceQuote {
    /// Creates a legacy quote.
    #[must_use]
    pub const fn legacy(gas_price: U256) -> Self {
        Self::Legacy { gas_price }
    }

    /// Creates an EIP-1559 quote.
    #[must_use]
    pub const fn eip1559(max_fee_per_gas: U256, max_priority_fee_per_gas: U256) -> Self {
        Self::Eip1559 {
            max_fee_per_gas,
            max_priority_fee_per_gas,
        }
    }

    /// Returns the price compared against ceilings: `maxFeePerGas` for
    /// EIP-1559 quotes, `gasPrice` otherwise.
    #[must_use]
    pub const fn comparable_price(&self) -> U256 {
        match self {
            Self::Legacy { gas_price } => *gas_price,
            Self::Eip1559 {
                max_fee_per_gas, ..
            } => *max_fee_per_gas,
        }
    }

    /// Returns true for EIP-1559 quotes.
    #[must_use]
    pub const fn is_eip1559(&self) -> bool {
        matches!(self, Self::Eip1559 { .. })
    }
}

impl fmt::Display for GasPriceQuote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Legacy { gas_price } => write!(f, "gasPrice={} gwei", format_gwei(*gas_price)),
            Self::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            } => write!(
                f,
                "maxFeePerGas={} gwei, maxPriorityFeePerGas={} gwei",
                format_gwei(*max_fee_per_gas),
                format_gwei(*max_priority_fee_per_gas)
            ),
        }
    }
}

/// Ready-to-send transaction overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOverrides {
    /// Gas-price fields.
    pub gas_price: GasPriceQuote,
    /// Gas limit, already scaled by the configured headroom.
    pub gas_limit: Option<U256>,
    /// Account nonce.
    pub nonce: Option<U256>,
}

impl TransactionOverrides {
    /// Creates overrides carrying only gas-price fields.
    #[must_use]
    pub const fn new(gas_price: GasPriceQuote) -> Self {
        Self {
            gas_price,
            gas_limit: None,
            nonce: None,
        }
    }

    /// Sets the gas limit.
    #[must_use]
    pub const fn with_gas_limit(mut self, gas_limit: U256) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }

    /// Sets the nonce.
    #[must_use]
    pub const fn with_nonce(mut self, nonce: U256) -> Self {
        self.nonce = Some(nonce);
        self
    }
}
