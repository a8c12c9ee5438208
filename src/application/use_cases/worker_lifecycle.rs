//! # Worker Lifecycle Use Case
//!
//! Hires this node to a principal and detects its retirement.
//!
//! State is never kept locally: every decision starts from a fresh read of
//! the worker manager. Hiring runs under an unbounded retry policy and any
//! error restarts the procedure from scratch.
//!
//! | State | Hire | Retire poll |
//! |---|---|---|
//! | Owned | return the owner | nothing to do |
//! | Pending | `acceptJob`, confirm, return the owner | nothing to do |
//! | Available | sleep one polling interval, re-read | nothing to do |
//! | Retired | settle funds, stop | settle funds, stop |

use crate::application::error::{NodeError, NodeResult};
use crate::application::ports::{FeeSource, NodeAccount, OwnerLookup, WorkerManager};
use crate::application::services::{ConfirmationPolicy, RetryPolicy, execute_with_retry};
use crate::domain::value_objects::{WorkerState, format_gwei};
use ethers::types::{Address, U256};
use ethers::utils::format_ether;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Result of the hiring procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HireOutcome {
    /// The node works for this principal.
    Hired(Address),
    /// The node was retired by this principal; funds were settled.
    Retired(Address),
}

/// Outcome of a retirement settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// Nothing left to return.
    AlreadySettled,
    /// The balance does not cover the transfer fee.
    BelowFee {
        /// Node balance.
        balance: U256,
        /// Fee of the transfer.
        fee: U256,
    },
    /// `value` wei were sent to `beneficiary`.
    Transferred {
        /// Recipient of the residual funds.
        beneficiary: Address,
        /// Amount sent.
        value: U256,
    },
}

/// Worker hiring and retirement.
pub struct WorkerLifecycle {
    worker_manager: Arc<dyn WorkerManager>,
    account: Arc<dyn NodeAccount>,
    fee_source: Arc<dyn FeeSource>,
    owner_lookup: Arc<dyn OwnerLookup>,
    confirmation: ConfirmationPolicy,
    polling_interval: Duration,
    retry: RetryPolicy,
}

impl fmt::Debug for WorkerLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerLifecycle")
            .field("worker", &self.account.address())
            .field("polling_interval", &self.polling_interval)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl WorkerLifecycle {
    /// Creates the lifecycle manager.
    #[must_use]
    pub fn new(
        worker_manager: Arc<dyn WorkerManager>,
        account: Arc<dyn NodeAccount>,
        fee_source: Arc<dyn FeeSource>,
        owner_lookup: Arc<dyn OwnerLookup>,
        confirmation: ConfirmationPolicy,
        polling_interval: Duration,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            worker_manager,
            account,
            fee_source,
            owner_lookup,
            confirmation,
            polling_interval,
            retry,
        }
    }

    /// Address of this worker.
    #[must_use]
    pub fn worker(&self) -> Address {
        self.account.address()
    }

    /// Reads the current worker state.
    ///
    /// # Errors
    ///
    /// Returns `NodeError::UnknownWorkerState` if no predicate holds, or the
    /// read error.
    pub async fn state(&self) -> NodeResult<WorkerState> {
        if self.worker_manager.is_owned().await? {
            return Ok(WorkerState::Owned);
        }
        if self.worker_manager.is_retired().await? {
            return Ok(WorkerState::Retired);
        }
        if self.worker_manager.is_available().await? {
            return Ok(WorkerState::Available);
        }
        if self.worker_manager.is_pending().await? {
            return Ok(WorkerState::Pending);
        }
        Err(NodeError::UnknownWorkerState(self.worker()))
    }

    /// Hires the node, retrying until it is owned or retired.
    ///
    /// # Errors
    ///
    /// Returns an error only if the retry policy gives up.
    pub async fn hire(&self) -> NodeResult<HireOutcome> {
        execute_with_retry(&self.retry, "hire", || self.hire_once())
            .await
            .map_err(NodeError::from)
    }

    async fn hire_once(&self) -> NodeResult<HireOutcome> {
        let worker = self.worker();
        let mut announced = false;

        loop {
            match self.state().await? {
                WorkerState::Owned => {
                    let owner = self.worker_manager.get_owner(worker).await?;
                    info!("[{:?}] owned by {:?}", worker, owner);
                    return Ok(HireOutcome::Hired(owner));
                }
                WorkerState::Retired => {
                    let owner = self.worker_manager.get_owner(worker).await?;
                    warn!("[{:?}] retired by {:?}", worker, owner);
                    self.settle(owner).await?;
                    return Ok(HireOutcome::Retired(owner));
                }
                WorkerState::Available => {
                    if !announced {
                        info!("[{:?}] available for hiring", worker);
                        announced = true;
                    }
                    sleep(self.polling_interval).await;
                }
                WorkerState::Pending => {
                    let user = self.worker_manager.get_user().await?;
                    info!("[{:?}] accepting job from {:?}...", worker, user);

                    let tx_hash = self.worker_manager.accept_job().await?;
                    info!("[{:?}] transaction {:?}, waiting for confirmation...", worker, tx_hash);
                    let receipt = self.confirmation.wait(self.account.as_ref(), tx_hash).await?;
                    debug!("[{:?}] job accepted, {}", worker, receipt);

                    let owner = self.worker_manager.get_owner(worker).await?;
                    return Ok(HireOutcome::Hired(owner));
                }
            }
        }
    }

    /// Returns true if `principal` is a staking pool.
    ///
    /// A pool hires workers on its own behalf, so the worker manager reports
    /// it as its own owner.
    ///
    /// # Errors
    ///
    /// Returns the read error.
    pub async fn is_pool(&self, principal: Address) -> NodeResult<bool> {
        Ok(self.worker_manager.get_owner(principal).await? == principal)
    }

    /// Polls for retirement and settles funds when it happened.
    ///
    /// Returns true if the worker is retired and the caller must stop.
    ///
    /// # Errors
    ///
    /// Returns any read, pricing or transfer error.
    pub async fn retire(&self, principal: Address) -> NodeResult<bool> {
        if !self.worker_manager.is_retired().await? {
            return Ok(false);
        }
        warn!("[{:?}] retired by {:?}", self.worker(), principal);
        self.settle(principal).await?;
        Ok(true)
    }

    /// Returns the node's residual balance to the principal (or, for a pool,
    /// to the pool's owner), keeping only the transfer fee.
    ///
    /// # Errors
    ///
    /// Returns any read, pricing or transfer error.
    pub async fn settle(&self, principal: Address) -> NodeResult<Settlement> {
        let worker = self.worker();
        let beneficiary = if self.is_pool(principal).await? {
            self.owner_lookup.owner_of(principal).await?
        } else {
            principal
        };

        let balance = self.account.balance().await?;
        if balance.is_zero() {
            info!("[{:?}] no funds left to return", worker);
            return Ok(Settlement::AlreadySettled);
        }

        let gas = self.account.estimate_transfer_gas(beneficiary, balance).await?;
        let gas_price = self.fee_source.gas_price().await?;
        let fee = gas_price.saturating_mul(gas);
        if balance <= fee {
            warn!(
                "[{:?}] balance of {} ETH does not cover the {} ETH transfer fee",
                worker,
                format_ether(balance),
                format_ether(fee)
            );
            return Ok(Settlement::BelowFee { balance, fee });
        }

        let value = balance - fee;
        info!(
            "[{:?}] returning {} ETH to {:?} (gas price {} gwei)",
            worker,
            format_ether(value),
            beneficiary,
            format_gwei(gas_price)
        );
        let tx_hash = self
            .account
            .send_transfer(beneficiary, value, gas_price, gas)
            .await?;
        let receipt = self.confirmation.wait(self.account.as_ref(), tx_hash).await?;
        info!("[{:?}] funds returned, {}", worker, receipt);

        Ok(Settlement::Transferred { beneficiary, value })
    }
}
