//! # Transaction Receipt Summary
//!
//! The parts of a mined receipt the node reports.

use ethers::types::{TxHash, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a confirmed transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceiptSummary {
    /// Transaction hash.
    pub tx_hash: TxHash,
    /// Gas consumed, when the node reports it.
    pub gas_used: Option<U256>,
    /// Price actually paid per gas, when the node reports it.
    pub effective_gas_price: Option<U256>,
}

impl TxReceiptSummary {
    /// Creates a summary with only the hash set.
    #[must_use]
    pub const fn new(tx_hash: TxHash) -> Self {
        Self {
            tx_hash,
            gas_used: None,
            effective_gas_price: None,
        }
    }

    /// Sets the gas used.
    #[must_use]
    pub const fn with_gas_used(mut self, gas_used: U256) -> Self {
        self.gas_used = Some(gas_used);
        self
    }
}

impl fmt::Display for TxReceiptSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.tx_hash)?;
        if let Some(gas_used) = self.gas_used {
            write!(f, ", gas used {gas_used}")?;
        }
        if let Some(price) = self.effective_gas_price {
            write!(f, " at price {price}")?;
        }
        Ok(())
    }
}
