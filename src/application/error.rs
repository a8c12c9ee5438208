//! # Node Errors
//!
//! Error types for the node's use cases and services.
//!
//! Every remote failure surfaces as a [`NodeError`]. The enclosing iteration
//! (a production pass, a rebalance, a retirement poll) catches it, logs it and
//! moves on; only configuration errors are treated as permanent.

use crate::application::services::retry::{RetryError, Retryable};
use crate::domain::value_objects::format_gwei;
use ethers::types::{TxHash, U256};
use std::time::Duration;
use thiserror::Error;

/// Node error.
#[derive(Debug, Error)]
pub enum NodeError {
    /// A contract read, gas estimate or submission failed.
    #[error("chain error: {0}")]
    Chain(String),

    /// The transaction was sent but did not reach the required confirmations in time.
    #[error("transaction {tx_hash:?} sent but not confirmed within {}", fmt_wait(.waited))]
    ConfirmationTimeout {
        /// Hash of the pending transaction.
        tx_hash: TxHash,
        /// How long the node waited.
        waited: Duration,
    },

    /// The node dropped the transaction from its pool.
    #[error("transaction {0:?} dropped from the mempool")]
    TransactionDropped(TxHash),

    /// Every gas-price strategy failed.
    #[error("gas price unavailable: {0}")]
    GasPriceUnavailable(String),

    /// The quoted price reached the configured ceiling.
    #[error(
        "current gas price of {} gwei is at or above the allowed {} gwei",
        fmt_gwei(.current),
        fmt_gwei(.ceiling)
    )]
    GasPriceSpike {
        /// Quoted price in wei.
        current: U256,
        /// Configured ceiling in wei.
        ceiling: U256,
    },

    /// The external gas oracle failed or returned an unusable payload.
    #[error("gas oracle error: {0}")]
    GasOracle(String),

    /// The worker manager reported no known state.
    #[error("worker {0:?} is in an unknown state")]
    UnknownWorkerState(ethers::types::Address),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl NodeError {
    /// Creates a chain error.
    #[must_use]
    pub fn chain(message: impl Into<String>) -> Self {
        Self::Chain(message.into())
    }

    /// Creates a gas-price-unavailable error.
    #[must_use]
    pub fn gas_price_unavailable(message: impl Into<String>) -> Self {
        Self::GasPriceUnavailable(message.into())
    }

    /// Creates a gas oracle error.
    #[must_use]
    pub fn gas_oracle(message: impl Into<String>) -> Self {
        Self::GasOracle(message.into())
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true for the "sent but not confirmed in time" failure.
    #[must_use]
    pub fn is_confirmation_timeout(&self) -> bool {
        matches!(self, Self::ConfirmationTimeout { .. })
    }

    /// Returns true when the spike guard refused the price.
    #[must_use]
    pub fn is_gas_price_spike(&self) -> bool {
        matches!(self, Self::GasPriceSpike { .. })
    }
}

impl Retryable for NodeError {
    fn is_retryable(&self) -> bool {
        !matches!(self, Self::Config(_))
    }
}

impl From<RetryError<NodeError>> for NodeError {
    fn from(err: RetryError<NodeError>) -> Self {
        let summary = err.to_string();
        err.into_inner()
            .unwrap_or_else(|| NodeError::internal(summary))
    }
}

fn fmt_wait(waited: &Duration) -> String {
    humantime::format_duration(*waited).to_string()
}

fn fmt_gwei(wei: &U256) -> String {
    format_gwei(*wei)
}

/// Result type for node operations.
pub type NodeResult<T> = Result<T, NodeError>;
