//! Confirmation waits bounded by a timeout.

use crate::application::error::{NodeError, NodeResult};
use crate::application::ports::NodeAccount;
use crate::domain::value_objects::TxReceiptSummary;
use ethers::types::TxHash;
use std::time::Duration;
use tokio::time::timeout;

/// Default number of confirmations.
pub const DEFAULT_CONFIRMATIONS: usize = 1;

/// Default confirmation timeout (10 minutes).
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// How many confirmations to wait for, and for how long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationPolicy {
    /// Required confirmations.
    pub confirmations: usize,
    /// Upper bound on the wait.
    pub timeout: Duration,
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            confirmations: DEFAULT_CONFIRMATIONS,
            timeout: DEFAULT_CONFIRMATION_TIMEOUT,
        }
    }
}

impl ConfirmationPolicy {
    /// Creates a policy.
    #[must_use]
    pub const fn new(confirmations: usize, timeout: Duration) -> Self {
        Self {
            confirmations,
            timeout,
        }
    }

    /// Waits for `tx_hash` under the timeout.
    ///
    /// # Errors
    ///
    /// Returns `NodeError::ConfirmationTimeout` when the timeout elapses
    /// first, or the account's error if the wait itself fails.
    pub async fn wait(
        &self,
        account: &dyn NodeAccount,
        tx_hash: TxHash,
    ) -> NodeResult<TxReceiptSummary> {
        match timeout(
            self.timeout,
            account.wait_for_confirmations(tx_hash, self.confirmations),
        )
        .await
        {
            Ok(receipt) => receipt,
            Err(_) => Err(NodeError::ConfirmationTimeout {
                tx_hash,
                waited: self.timeout,
            }),
        }
    }
}
