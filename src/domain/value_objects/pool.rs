//! # Pool Amounts
//!
//! Queued amounts a staking pool moves on its next rebalance.

use super::units::format_ctsi;
use ethers::types::U256;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stake, unstake and withdraw queues reported by `amounts()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PoolAmounts {
    /// Amount waiting to be staked.
    pub stake: U256,
    /// Amount waiting to be unstaked.
    pub unstake: U256,
    /// Amount waiting to be withdrawn.
    pub withdraw: U256,
}

impl PoolAmounts {
    /// Creates a new set of queued amounts.
    #[must_use]
    pub const fn new(stake: U256, unstake: U256, withdraw: U256) -> Self {
        Self {
            stake,
            unstake,
            withdraw,
        }
    }

    /// Returns true when every queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stake.is_zero() && self.unstake.is_zero() && self.withdraw.is_zero()
    }
}

impl fmt::Display for PoolAmounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "stake {} CTSI, unstake {} CTSI, withdraw {} CTSI",
            format_ctsi(self.stake),
            format_ctsi(self.unstake),
            format_ctsi(self.withdraw)
        )
    }
}
