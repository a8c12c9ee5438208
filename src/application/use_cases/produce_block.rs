//! # Produce Block Use Case
//!
//! One block-production pass over every chain of a protocol deployment.
//!
//! The pass:
//! - Reads the chain count and checks authorization (every pass, never cached)
//! - Visits chains strictly in index order, one at a time
//! - Skips inactive chains, zero rewards and zero stakes
//! - Asks the on-chain selector for eligibility
//! - Skips attempts inside the selector's rollover window
//! - Submits the production transaction and waits for confirmations
//!
//! A failure on one chain is logged, counted and scoped to that chain; the
//! pass moves on to the next index.

use crate::application::error::NodeResult;
use crate::application::ports::{ChainClient, NodeAccount, ProtocolClient};
use crate::application::services::ConfirmationPolicy;
use crate::domain::value_objects::{BlockInterval, TxReceiptSummary, format_ctsi};
use crate::infrastructure::monitoring::NodeMetrics;
use ethers::types::{Address, U256};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, error, info, warn};

/// What happened on one chain during a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainOutcome {
    /// The protocol no longer accepts blocks on this chain.
    Inactive,
    /// The reward for the next block is zero.
    ZeroReward,
    /// The principal has nothing at stake.
    NothingStaked,
    /// The selector did not pick the principal.
    NotEligible,
    /// Eligible, but too close to the selector's 256-block rollover.
    RolloverWindow(BlockInterval),
    /// A block was produced and confirmed.
    Produced(TxReceiptSummary),
}

impl ChainOutcome {
    /// Returns true if a transaction was confirmed.
    #[must_use]
    pub fn is_produced(&self) -> bool {
        matches!(self, Self::Produced(_))
    }
}

/// Block production over all chains of one protocol.
pub struct BlockProducer {
    worker: Address,
    protocol: Arc<dyn ProtocolClient>,
    account: Arc<dyn NodeAccount>,
    confirmation: ConfirmationPolicy,
    metrics: Arc<NodeMetrics>,
}

impl fmt::Debug for BlockProducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockProducer")
            .field("worker", &self.worker)
            .field("confirmation", &self.confirmation)
            .finish_non_exhaustive()
    }
}

impl BlockProducer {
    /// Creates a producer acting through `account`.
    #[must_use]
    pub fn new(
        protocol: Arc<dyn ProtocolClient>,
        account: Arc<dyn NodeAccount>,
        confirmation: ConfirmationPolicy,
        metrics: Arc<NodeMetrics>,
    ) -> Self {
        Self {
            worker: account.address(),
            protocol,
            account,
            confirmation,
            metrics,
        }
    }

    /// Runs one production pass for `user`.
    ///
    /// Returns `false` if the node is not authorized for `user`, `true` once
    /// every chain was visited.
    ///
    /// # Errors
    ///
    /// Returns an error only if the chain count or the authorization check
    /// cannot be read. Per-chain failures are logged and counted instead.
    pub async fn produce_block(&self, user: Address) -> NodeResult<bool> {
        let chains = self.protocol.number_of_chains().await?;

        if !self.protocol.is_authorized(user).await? {
            if chains == 0 {
                warn!("[{:?}] not authorized for {:?}", self.worker, user);
            } else {
                error!("[{:?}] not authorized for {:?}", self.worker, user);
            }
            return Ok(false);
        }

        if chains == 0 {
            debug!("[{:?}] no chains", self.worker);
            return Ok(true);
        }

        for index in 0..chains {
            let chain = self.protocol.chain(index);
            if let Err(e) = self.produce_on_chain(chain.as_ref(), user).await {
                error!(chain = index, error = %e, "[{:?}/{}] {}", self.worker, index, e);
                self.metrics.errors.inc();
            }
        }

        Ok(true)
    }

    /// Evaluates and, if eligible, produces on a single chain.
    ///
    /// # Errors
    ///
    /// Returns any read, submission or confirmation error.
    pub async fn produce_on_chain(
        &self,
        chain: &dyn ChainClient,
        user: Address,
    ) -> NodeResult<ChainOutcome> {
        let index = chain.index();

        if !chain.is_active().await? {
            if index > 0 {
                debug!("[{:?}/{}] inactive", self.worker, index);
            }
            return Ok(ChainOutcome::Inactive);
        }

        let reward = chain.current_reward().await?;
        if reward.is_zero() {
            debug!("[{:?}/{}] zero reward", self.worker, index);
            return Ok(ChainOutcome::ZeroReward);
        }

        let staked = chain.staked_balance(user).await?;
        let maturing = chain.maturing_balance(user).await?;
        let maturing_at = chain.maturing_timestamp(user).await?;
        self.metrics.set_stake(staked);
        self.log_stake(index, staked, maturing, maturing_at);

        if staked.is_zero() {
            return Ok(ChainOutcome::NothingStaked);
        }

        let eligible = chain.can_produce_block(user, staked).await?;
        self.metrics.eligibility.inc();
        debug!("[{:?}/{}] eligibleForNextBlock={}", self.worker, index, eligible);
        if !eligible {
            return Ok(ChainOutcome::NotEligible);
        }
        self.metrics.eligibility_granted.inc();

        let interval = chain.block_interval(user).await?;
        if interval.is_in_rollover_window() {
            debug!(
                "[{:?}/{}] block interval {} too close to selector rollover, skipping",
                self.worker, index, interval
            );
            return Ok(ChainOutcome::RolloverWindow(interval));
        }

        info!(
            "[{:?}/{}] trying to produce block and claim reward of {} CTSI...",
            self.worker,
            index,
            format_ctsi(reward)
        );
        let tx_hash = chain.produce_block().await?;
        info!(
            "[{:?}/{}] transaction {:?}, waiting for {} confirmation(s)...",
            self.worker, index, tx_hash, self.confirmation.confirmations
        );

        let receipt = self.confirmation.wait(self.account.as_ref(), tx_hash).await?;
        info!("[{:?}/{}] block produced, {}", self.worker, index, receipt);
        self.metrics.blocks.inc();

        Ok(ChainOutcome::Produced(receipt))
    }

    fn log_stake(&self, index: usize, staked: U256, maturing: U256, maturing_at: u64) {
        if maturing.is_zero() {
            debug!(
                "[{:?}/{}] {} CTSI at stake",
                self.worker,
                index,
                format_ctsi(staked)
            );
            return;
        }

        let now = unix_now();
        if maturing_at > now {
            debug!(
                "[{:?}/{}] {} CTSI at stake, {} CTSI maturing in {}",
                self.worker,
                index,
                format_ctsi(staked),
                format_ctsi(maturing),
                humantime::format_duration(Duration::from_secs(maturing_at - now))
            );
        } else {
            warn!(
                "[{:?}/{}] {} CTSI at stake, {} CTSI maturing past due {}",
                self.worker,
                index,
                format_ctsi(staked),
                format_ctsi(maturing),
                humantime::format_duration(Duration::from_secs(now - maturing_at))
            );
        }
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
