//! # Block Interval
//!
//! Distance between the selector's current block and its goal block.
//!
//! The block selector only looks back 256 blocks when computing a winner. An
//! attempt made right at (or just before) a 256-block boundary can be mined
//! after the selector has rolled over and would revert, so those intervals are
//! skipped.

use ethers::types::U256;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Size of the selector's block-hash window.
pub const SELECTOR_WINDOW: u64 = 256;

/// Lowest in-window offset that is too close to the rollover.
pub const ROLLOVER_GUARD: u64 = 254;

/// `currentBlock - goalBlockNumber` for one chain and principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockInterval(U256);

impl BlockInterval {
    /// Wraps a raw interval.
    #[inline]
    #[must_use]
    pub const fn new(interval: U256) -> Self {
        Self(interval)
    }

    /// Computes the interval from the selector state.
    ///
    /// Saturates at zero if the goal lies ahead of the current block.
    #[must_use]
    pub fn between(current_block: U256, goal_block: U256) -> Self {
        Self(current_block.saturating_sub(goal_block))
    }

    /// Returns the raw interval.
    #[inline]
    #[must_use]
    pub const fn get(self) -> U256 {
        self.0
    }

    /// Returns the offset inside the 256-block window.
    #[must_use]
    pub fn window_offset(self) -> u64 {
        (self.0 % U256::from(SELECTOR_WINDOW)).low_u64()
    }

    /// Returns true when production must be skipped: offset 0, 254 or 255.
    #[must_use]
    pub fn is_in_rollover_window(self) -> bool {
        let offset = self.window_offset();
        offset == 0 || offset >= ROLLOVER_GUARD
    }
}

impl fmt::Display for BlockInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<U256> for BlockInterval {
    fn from(value: U256) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interval(n: u64) -> BlockInterval {
        BlockInterval::new(U256::from(n))
    }

    #[test]
    fn boundary_offsets_are_skipped() {
        for n in [0u64, 254, 255, 256, 510, 511, 512, 256 * 40 + 255] {
            assert!(interval(n).is_in_rollover_window(), "interval {n}");
        }
    }

    #[test]
    fn inner_offsets_proceed() {
        for n in [1u64, 2, 100, 253, 257, 509, 256 * 7 + 253] {
            assert!(!interval(n).is_in_rollover_window(), "interval {n}");
        }
    }

    #[test]
    fn between_saturates() {
        let i = BlockInterval::between(U256::from(10u64), U256::from(25u64));
        assert_eq!(i.get(), U256::zero());

        let i = BlockInterval::between(U256::from(300u64), U256::from(40u64));
        assert_eq!(i.get(), U256::from(260u64));
        assert_eq!(i.window_offset(), 4);
    }
}
