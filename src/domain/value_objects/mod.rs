//! # Value Objects
//!
//! Immutable types with domain semantics.
//!
//! ## Gas Pricing
//!
//! - [`GasPriceQuote`]: legacy price or EIP-1559 fee pair
//! - [`TransactionOverrides`]: quote plus gas limit and nonce
//!
//! ## Block Production
//!
//! - [`BlockInterval`]: selector interval with the rollover-window guard
//!
//! ## Worker and Pool
//!
//! - [`WorkerState`]: worker manager lifecycle state
//! - [`PoolAmounts`]: queued pool amounts
//! - [`TxReceiptSummary`]: confirmed transaction outcome

pub mod block_interval;
pub mod gas;
pub mod pool;
pub mod receipt;
pub mod units;
pub mod worker_state;

pub use block_interval::BlockInterval;
pub use gas::{
    GasPriceQuote, TransactionOverrides, WEI_PER_DECIGWEI, WEI_PER_GWEI, format_gwei,
    gwei_to_wei, scale_percent,
};
pub use pool::PoolAmounts;
pub use receipt::TxReceiptSummary;
pub use units::{format_ctsi, to_f64_units};
pub use worker_state::WorkerState;

#[cfg(test)]
mod tests;
