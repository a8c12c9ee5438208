//! # Pool Rebalance Use Case
//!
//! Moves queued pool funds between the stake, unstake and withdraw queues.
//!
//! Rebalance submissions are throttled: after a confirmed rebalance no other
//! one is sent until the minimum interval has passed. The two-phase
//! [`cycle`](PoolRebalancer::cycle) additionally matures queued stake and
//! releases queued withdrawals when the pool allows it.

use crate::application::error::NodeResult;
use crate::application::ports::{NodeAccount, StakingPool};
use crate::application::services::ConfirmationPolicy;
use crate::domain::value_objects::TxReceiptSummary;
use crate::infrastructure::monitoring::NodeMetrics;
use ethers::types::TxHash;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// Default minimum time between rebalances (60 minutes).
pub const DEFAULT_REBALANCE_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Throttle state for rebalance submissions.
#[derive(Debug, Clone, Copy)]
pub struct RebalanceState {
    last_rebalance: Option<Instant>,
    min_interval: Duration,
}

impl RebalanceState {
    /// Creates a state that allows an immediate rebalance.
    #[must_use]
    pub const fn new(min_interval: Duration) -> Self {
        Self {
            last_rebalance: None,
            min_interval,
        }
    }

    /// Time left before the next rebalance is allowed, if any.
    #[must_use]
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        let last = self.last_rebalance?;
        let next = last + self.min_interval;
        (next > now).then(|| next - now)
    }

    /// Records a confirmed rebalance at `now`.
    pub fn record(&mut self, now: Instant) {
        self.last_rebalance = Some(now);
    }

    /// Minimum interval between rebalances.
    #[must_use]
    pub const fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Time of the last confirmed rebalance.
    #[must_use]
    pub const fn last_rebalance(&self) -> Option<Instant> {
        self.last_rebalance
    }
}

/// Staking pool maintenance.
pub struct PoolRebalancer {
    pool: Arc<dyn StakingPool>,
    account: Arc<dyn NodeAccount>,
    confirmation: ConfirmationPolicy,
    state: Mutex<RebalanceState>,
    metrics: Arc<NodeMetrics>,
}

impl fmt::Debug for PoolRebalancer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolRebalancer")
            .field("pool", &self.pool.address())
            .field("state", &*self.lock_state())
            .finish_non_exhaustive()
    }
}

impl PoolRebalancer {
    /// Creates a rebalancer with the given minimum interval.
    #[must_use]
    pub fn new(
        pool: Arc<dyn StakingPool>,
        account: Arc<dyn NodeAccount>,
        confirmation: ConfirmationPolicy,
        min_interval: Duration,
        metrics: Arc<NodeMetrics>,
    ) -> Self {
        Self {
            pool,
            account,
            confirmation,
            state: Mutex::new(RebalanceState::new(min_interval)),
            metrics,
        }
    }

    /// Current throttle state.
    #[must_use]
    pub fn state(&self) -> RebalanceState {
        *self.lock_state()
    }

    /// Rebalances the pool if anything is queued and the throttle allows it.
    ///
    /// Returns true if a rebalance was submitted and confirmed.
    ///
    /// # Errors
    ///
    /// Returns any read, submission or confirmation error. The throttle is
    /// only advanced on success.
    pub async fn rebalance(&self) -> NodeResult<bool> {
        let address = self.pool.address();
        let amounts = self.pool.amounts().await?;
        if amounts.is_empty() {
            debug!("[{:?}] nothing to rebalance", address);
            return Ok(false);
        }

        info!("[{:?}] rebalancing, {}", address, amounts);

        let state = self.state();
        if let Some(remaining) = state.remaining(Instant::now()) {
            let since = state
                .last_rebalance()
                .map(|last| last.elapsed())
                .unwrap_or_default();
            info!(
                "[{:?}] not enough time since last rebalance ({}). rebalance interval = {}. next rebalance in {}",
                address,
                humantime::format_duration(round_secs(since)),
                humantime::format_duration(state.min_interval()),
                humantime::format_duration(round_secs(remaining))
            );
            return Ok(false);
        }

        let tx_hash = self.pool.rebalance().await?;
        let receipt = self.confirm(tx_hash).await?;
        info!("[{:?}] rebalanced, {}", address, receipt);

        self.lock_state().record(Instant::now());
        self.metrics.rebalances.inc();
        Ok(true)
    }

    /// Two-phase cycle: throttled rebalance, then stake maturation and
    /// withdraw release when each queue is non-empty and permitted.
    ///
    /// Returns true if any transaction was submitted and confirmed.
    ///
    /// # Errors
    ///
    /// Returns the first read, submission or confirmation error.
    pub async fn cycle(&self) -> NodeResult<bool> {
        let address = self.pool.address();
        let mut submitted = self.rebalance().await?;

        let amounts = self.pool.amounts().await?;

        if !amounts.stake.is_zero() && self.pool.can_cycle_stake_maturation().await? {
            info!("[{:?}] maturing queued stake", address);
            let tx_hash = self.pool.cycle_stake_maturation().await?;
            let receipt = self.confirm(tx_hash).await?;
            info!("[{:?}] stake matured, {}", address, receipt);
            submitted = true;
        }

        if !amounts.withdraw.is_zero() && self.pool.can_cycle_withdraw_release().await? {
            info!("[{:?}] releasing queued withdrawals", address);
            let tx_hash = self.pool.cycle_withdraw_release().await?;
            let receipt = self.confirm(tx_hash).await?;
            info!("[{:?}] withdrawals released, {}", address, receipt);
            submitted = true;
        }

        Ok(submitted)
    }

    async fn confirm(&self, tx_hash: TxHash) -> NodeResult<TxReceiptSummary> {
        info!(
            "[{:?}] transaction {:?}, waiting for {} confirmation(s)...",
            self.pool.address(),
            tx_hash,
            self.confirmation.confirmations
        );
        self.confirmation.wait(self.account.as_ref(), tx_hash).await
    }

    /// Locks the throttle state, recovering from poison if needed.
    fn lock_state(&self) -> MutexGuard<'_, RebalanceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn round_secs(duration: Duration) -> Duration {
    Duration::from_secs(duration.as_secs())
}
